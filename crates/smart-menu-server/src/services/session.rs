//! Async driver for [`MenuBrowser`].
//!
//! Executes the machine's fetch effects on tokio tasks. Each slot
//! (categories / items) has at most one live task: issuing a new fetch aborts
//! the previous one, and dropping the session aborts everything still in
//! flight.

use crate::i18n::Locale;
use crate::menu::api::MenuApi;
use crate::menu::browser::{BrowserInit, BrowserView, Effect, FetchSlot, MenuBrowser, RequestTicket};
use crate::menu::model::{MealKind, SubcategoryId};
use futures::future::{AbortHandle, Abortable};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Notify;
use tracing::debug;

struct SessionInner {
    api: Arc<dyn MenuApi>,
    browser: Mutex<MenuBrowser>,
    inflight: Mutex<HashMap<FetchSlot, (RequestTicket, AbortHandle)>>,
    history: Mutex<Vec<String>>,
    idle: Notify,
}

pub struct MenuSession {
    inner: Arc<SessionInner>,
}

impl MenuSession {
    /// Builds the machine and kicks off its first effects.
    pub fn start(api: Arc<dyn MenuApi>, init: BrowserInit) -> Self {
        let mut browser = MenuBrowser::new(init);
        let effects = browser.start();

        let inner = Arc::new(SessionInner {
            api,
            browser: Mutex::new(browser),
            inflight: Mutex::new(HashMap::new()),
            history: Mutex::new(Vec::new()),
            idle: Notify::new(),
        });
        SessionInner::dispatch(&inner, effects);

        Self { inner }
    }

    pub fn view(&self) -> BrowserView {
        self.inner.browser.lock().view()
    }

    pub fn location(&self) -> String {
        self.inner.browser.lock().location().to_string()
    }

    /// Every URL the machine asked to replace, oldest first.
    pub fn url_history(&self) -> Vec<String> {
        self.inner.history.lock().clone()
    }

    pub fn is_idle(&self) -> bool {
        self.inner.inflight.lock().is_empty()
    }

    /// Resolves once no fetch is in flight (including follow-up fetches
    /// triggered by earlier results).
    pub async fn settled(&self) {
        loop {
            let notified = self.inner.idle.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();
            if self.is_idle() {
                return;
            }
            notified.await;
        }
    }

    // ===== USER ACTIONS =====

    pub fn select_category(&self, category_id: &str) {
        let effects = self.inner.browser.lock().select_category(category_id);
        SessionInner::dispatch(&self.inner, effects);
    }

    pub fn select_subcategory(&self, subcategory_id: SubcategoryId) {
        let effects = self.inner.browser.lock().select_subcategory(subcategory_id);
        SessionInner::dispatch(&self.inner, effects);
    }

    pub fn set_meal_kind(&self, meal: MealKind) {
        let effects = self.inner.browser.lock().set_meal_kind(meal);
        SessionInner::dispatch(&self.inner, effects);
    }

    pub fn set_locale(&self, locale: Locale) {
        let effects = self.inner.browser.lock().set_locale(locale);
        SessionInner::dispatch(&self.inner, effects);
    }

    pub fn set_restaurant(&self, restaurant_id: &str) {
        let effects = self.inner.browser.lock().set_restaurant(restaurant_id);
        SessionInner::dispatch(&self.inner, effects);
    }
}

impl Drop for MenuSession {
    fn drop(&mut self) {
        let inflight: Vec<_> = self.inner.inflight.lock().drain().collect();
        for (slot, (ticket, handle)) in inflight {
            debug!("Aborting {:?} fetch {:?} on session drop", slot, ticket);
            handle.abort();
        }
    }
}

impl SessionInner {
    fn dispatch(inner: &Arc<Self>, effects: Vec<Effect>) {
        for effect in effects {
            match effect {
                Effect::ReplaceUrl(url) => {
                    debug!("Replacing URL with {}", url);
                    inner.history.lock().push(url);
                }
                Effect::FetchCategories {
                    ticket,
                    restaurant_id,
                    meal,
                } => {
                    let api = inner.api.clone();
                    Self::spawn(inner, FetchSlot::Categories, ticket, async move {
                        let result = api.fetch_categories(&restaurant_id, meal).await;
                        move |browser: &mut MenuBrowser| browser.apply_categories(ticket, result)
                    });
                }
                Effect::FetchItems { ticket, query } => {
                    let api = inner.api.clone();
                    Self::spawn(inner, FetchSlot::Items, ticket, async move {
                        let result = api.fetch_items(&query).await;
                        move |browser: &mut MenuBrowser| browser.apply_items(ticket, result)
                    });
                }
            }
        }
    }

    /// Runs `fetch` as the only live task of `slot`. The future resolves to
    /// the transition to apply with its result.
    fn spawn<F, A>(inner: &Arc<Self>, slot: FetchSlot, ticket: RequestTicket, fetch: F)
    where
        F: std::future::Future<Output = A> + Send + 'static,
        A: FnOnce(&mut MenuBrowser) -> Vec<Effect> + Send + 'static,
    {
        let (handle, registration) = AbortHandle::new_pair();
        if let Some((old_ticket, old)) = inner.inflight.lock().insert(slot, (ticket, handle)) {
            debug!("Aborting superseded {:?} fetch {:?}", slot, old_ticket);
            old.abort();
        }

        let inner = Arc::clone(inner);
        tokio::spawn(async move {
            let Ok(apply) = Abortable::new(fetch, registration).await else {
                return;
            };

            let follow_up = {
                let mut browser = inner.browser.lock();
                apply(&mut *browser)
            };
            Self::dispatch(&inner, follow_up);

            let now_idle = {
                let mut inflight = inner.inflight.lock();
                if inflight.get(&slot).is_some_and(|(current, _)| *current == ticket) {
                    inflight.remove(&slot);
                }
                inflight.is_empty()
            };
            if now_idle {
                inner.idle.notify_waiters();
            }
        });
    }
}
