//! In-memory [`WireDriver`] implementation for tests.
//!
//! Models just enough of a browser to exercise the orchestration layers:
//! windows with elements, a tab order, deferred element reveal and window
//! spawn (to reproduce context-switch races), and scriptable effects that
//! run when an element is clicked, activated, or a chord is dispatched.
//! Every click, typed string, and key pulse is recorded for assertions.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use parking_lot::Mutex;

use webpilot_core_types::{ContextId, ElementId, Selector};

use crate::driver::WireDriver;
use crate::error::{DriverError, DriverErrorKind};
use crate::keys::{Key, KeyInput, KeyPulse, KeySequence};

/// Side effect attached to an element or chord.
#[derive(Clone, Debug)]
pub enum FakeEffect {
    /// Replace the URL of the window the event happened in.
    SetUrl(String),
    /// Spawn a new window holding `elements`, optionally only after N
    /// handle polls (simulates a popup that has not materialized yet).
    OpenWindow {
        url: String,
        delay_polls: u32,
        elements: Vec<ElementSpec>,
    },
    /// Make a hidden/deferred element in the same window findable.
    Reveal(String),
    /// Close the window the event happened in.
    CloseWindow,
}

/// Declarative element description for test setups.
#[derive(Clone, Debug)]
pub struct ElementSpec {
    pub test_id: Option<String>,
    pub dom_id: Option<String>,
    pub css_hooks: Vec<String>,
    pub xpath_hooks: Vec<String>,
    pub text: String,
    pub visible: bool,
    pub enabled: bool,
    /// Excluded from find results for this many find calls.
    pub reveal_after: u32,
    /// Reported as not displayed for this many displayed checks.
    pub visible_after: u32,
    pub child_tags: Vec<String>,
    pub on_click: Vec<FakeEffect>,
    pub on_activate: Vec<FakeEffect>,
}

impl Default for ElementSpec {
    fn default() -> Self {
        Self {
            test_id: None,
            dom_id: None,
            css_hooks: Vec::new(),
            xpath_hooks: Vec::new(),
            text: String::new(),
            visible: true,
            enabled: true,
            reveal_after: 0,
            visible_after: 0,
            child_tags: Vec::new(),
            on_click: Vec::new(),
            on_activate: Vec::new(),
        }
    }
}

impl ElementSpec {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_test_id(mut self, value: impl Into<String>) -> Self {
        self.test_id = Some(value.into());
        self
    }

    pub fn with_dom_id(mut self, value: impl Into<String>) -> Self {
        self.dom_id = Some(value.into());
        self
    }

    pub fn with_css_hook(mut self, value: impl Into<String>) -> Self {
        self.css_hooks.push(value.into());
        self
    }

    pub fn with_text(mut self, value: impl Into<String>) -> Self {
        self.text = value.into();
        self
    }

    pub fn hidden(mut self) -> Self {
        self.visible = false;
        self
    }

    pub fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }

    pub fn reveal_after(mut self, polls: u32) -> Self {
        self.reveal_after = polls;
        self
    }

    pub fn visible_after(mut self, polls: u32) -> Self {
        self.visible_after = polls;
        self
    }

    pub fn with_child_tag(mut self, value: impl Into<String>) -> Self {
        self.child_tags.push(value.into());
        self
    }

    pub fn on_click(mut self, effect: FakeEffect) -> Self {
        self.on_click.push(effect);
        self
    }

    pub fn on_activate(mut self, effect: FakeEffect) -> Self {
        self.on_activate.push(effect);
        self
    }
}

struct FakeElement {
    id: ElementId,
    spec: ElementSpec,
    reveal_in: u32,
    visible_in: u32,
    value: String,
}

impl FakeElement {
    fn describe(&self) -> String {
        self.spec
            .test_id
            .clone()
            .or_else(|| self.spec.dom_id.clone())
            .unwrap_or_else(|| self.id.0.clone())
    }

    fn matches(&self, selector: &Selector) -> bool {
        match selector {
            Selector::TestId(value) => self.spec.test_id.as_deref() == Some(value.as_str()),
            Selector::Id(value) => self.spec.dom_id.as_deref() == Some(value.as_str()),
            Selector::Css(value) => self.spec.css_hooks.iter().any(|hook| hook == value),
            Selector::Text(value) => self.spec.text.trim() == value,
            Selector::XPath(value) => self.spec.xpath_hooks.iter().any(|hook| hook == value),
        }
    }
}

#[derive(Default)]
struct FakeWindow {
    url: String,
    ready_in: u32,
    elements: Vec<FakeElement>,
    tab_order: Vec<String>,
    focus: Option<usize>,
    chords: Vec<(char, char, FakeEffect)>,
    held: Vec<char>,
}

struct PendingWindow {
    ctx: ContextId,
    window: FakeWindow,
    polls_left: u32,
}

#[derive(Default)]
struct FakeState {
    windows: BTreeMap<ContextId, FakeWindow>,
    pending: Vec<PendingWindow>,
    current: Option<ContextId>,
    clicks: Vec<String>,
    activations: Vec<String>,
    typed: Vec<(String, String)>,
    key_log: Vec<KeyPulse>,
    next_ctx: u32,
    next_el: u32,
}

impl FakeState {
    fn alloc_ctx(&mut self) -> ContextId {
        self.next_ctx += 1;
        ContextId::new(format!("w-{}", self.next_ctx))
    }

    fn alloc_el(&mut self) -> ElementId {
        self.next_el += 1;
        ElementId(format!("el-{}", self.next_el))
    }

    fn window(&self, ctx: &ContextId) -> Result<&FakeWindow, DriverError> {
        self.windows.get(ctx).ok_or_else(|| {
            DriverError::new(DriverErrorKind::NoSuchWindow).with_hint(ctx.to_string())
        })
    }

    fn window_mut(&mut self, ctx: &ContextId) -> Result<&mut FakeWindow, DriverError> {
        self.windows.get_mut(ctx).ok_or_else(|| {
            DriverError::new(DriverErrorKind::NoSuchWindow).with_hint(ctx.to_string())
        })
    }

    fn element_mut(
        &mut self,
        ctx: &ContextId,
        element: &ElementId,
    ) -> Result<&mut FakeElement, DriverError> {
        self.window_mut(ctx)?
            .elements
            .iter_mut()
            .find(|el| &el.id == element)
            .ok_or_else(|| {
                DriverError::new(DriverErrorKind::StaleElement).with_hint(element.to_string())
            })
    }

    fn focused_index(&self, ctx: &ContextId) -> Result<Option<usize>, DriverError> {
        let window = self.window(ctx)?;
        let Some(pos) = window.focus else {
            return Ok(None);
        };
        let Some(tag) = window.tab_order.get(pos) else {
            return Ok(None);
        };
        Ok(window
            .elements
            .iter()
            .position(|el| el.spec.test_id.as_deref() == Some(tag.as_str())))
    }

    fn build_window(&mut self, url: String, elements: Vec<ElementSpec>) -> FakeWindow {
        let elements = elements
            .into_iter()
            .map(|spec| FakeElement {
                id: self.alloc_el(),
                reveal_in: spec.reveal_after,
                visible_in: spec.visible_after,
                value: String::new(),
                spec,
            })
            .collect();
        FakeWindow {
            url,
            elements,
            ..FakeWindow::default()
        }
    }

    fn apply_effects(&mut self, ctx: &ContextId, effects: Vec<FakeEffect>) {
        for effect in effects {
            match effect {
                FakeEffect::SetUrl(url) => {
                    if let Some(window) = self.windows.get_mut(ctx) {
                        window.url = url;
                    }
                }
                FakeEffect::OpenWindow {
                    url,
                    delay_polls,
                    elements,
                } => {
                    let handle = self.alloc_ctx();
                    let window = self.build_window(url, elements);
                    if delay_polls == 0 {
                        self.windows.insert(handle, window);
                    } else {
                        self.pending.push(PendingWindow {
                            ctx: handle,
                            window,
                            polls_left: delay_polls,
                        });
                    }
                }
                FakeEffect::Reveal(tag) => {
                    if let Some(window) = self.windows.get_mut(ctx) {
                        for el in window
                            .elements
                            .iter_mut()
                            .filter(|el| el.spec.test_id.as_deref() == Some(tag.as_str()))
                        {
                            el.reveal_in = 0;
                            el.visible_in = 0;
                            el.spec.visible = true;
                        }
                    }
                }
                FakeEffect::CloseWindow => {
                    self.windows.remove(ctx);
                    if self.current.as_ref() == Some(ctx) {
                        self.current = None;
                    }
                }
            }
        }
    }
}

/// Scriptable in-memory driver.
pub struct FakeDriver {
    state: Mutex<FakeState>,
    alive: AtomicBool,
}

impl Default for FakeDriver {
    fn default() -> Self {
        Self::new()
    }
}

impl FakeDriver {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(FakeState::default()),
            alive: AtomicBool::new(true),
        }
    }

    fn ensure_alive(&self) -> Result<(), DriverError> {
        if self.alive.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(DriverError::new(DriverErrorKind::SessionLost).with_hint("session was killed"))
        }
    }

    // ---- test setup -----------------------------------------------------

    pub fn add_window(&self, url: impl Into<String>) -> ContextId {
        let mut state = self.state.lock();
        let ctx = state.alloc_ctx();
        state.windows.insert(
            ctx.clone(),
            FakeWindow {
                url: url.into(),
                ..FakeWindow::default()
            },
        );
        if state.current.is_none() {
            state.current = Some(ctx.clone());
        }
        ctx
    }

    pub fn add_element(&self, ctx: &ContextId, spec: ElementSpec) -> ElementId {
        let mut state = self.state.lock();
        let id = state.alloc_el();
        let element = FakeElement {
            id: id.clone(),
            reveal_in: spec.reveal_after,
            visible_in: spec.visible_after,
            value: String::new(),
            spec,
        };
        if let Some(window) = state.windows.get_mut(ctx) {
            window.elements.push(element);
        }
        id
    }

    pub fn set_tab_order(&self, ctx: &ContextId, tags: &[&str]) {
        let mut state = self.state.lock();
        if let Some(window) = state.windows.get_mut(ctx) {
            window.tab_order = tags.iter().map(|t| t.to_string()).collect();
            window.focus = None;
        }
    }

    pub fn on_chord(&self, ctx: &ContextId, modifier: Key, input: KeyInput, effect: FakeEffect) {
        let mut state = self.state.lock();
        if let Some(window) = state.windows.get_mut(ctx) {
            window.chords.push((modifier.code(), input.code(), effect));
        }
    }

    /// A window that only shows up in handle listings after `polls` calls.
    pub fn schedule_window(&self, url: impl Into<String>, polls: u32) -> ContextId {
        self.schedule_window_with(url, polls, Vec::new())
    }

    /// Like [`FakeDriver::schedule_window`], pre-populated with elements.
    pub fn schedule_window_with(
        &self,
        url: impl Into<String>,
        polls: u32,
        elements: Vec<ElementSpec>,
    ) -> ContextId {
        let mut state = self.state.lock();
        let ctx = state.alloc_ctx();
        let window = state.build_window(url.into(), elements);
        if polls == 0 {
            state.windows.insert(ctx.clone(), window);
        } else {
            state.pending.push(PendingWindow {
                ctx: ctx.clone(),
                window,
                polls_left: polls,
            });
        }
        ctx
    }

    pub fn set_ready_after(&self, ctx: &ContextId, polls: u32) {
        let mut state = self.state.lock();
        if let Some(window) = state.windows.get_mut(ctx) {
            window.ready_in = polls;
        }
    }

    /// Simulate losing the remote session.
    pub fn kill(&self) {
        self.alive.store(false, Ordering::SeqCst);
    }

    // ---- test introspection ---------------------------------------------

    pub fn clicks(&self) -> Vec<String> {
        self.state.lock().clicks.clone()
    }

    pub fn activations(&self) -> Vec<String> {
        self.state.lock().activations.clone()
    }

    pub fn typed(&self) -> Vec<(String, String)> {
        self.state.lock().typed.clone()
    }

    pub fn key_log(&self) -> Vec<KeyPulse> {
        self.state.lock().key_log.clone()
    }

    pub fn tab_presses(&self) -> usize {
        let tab = Key::Tab.code();
        self.state
            .lock()
            .key_log
            .iter()
            .filter(|pulse| matches!(pulse, KeyPulse::Down(c) if *c == tab))
            .count()
    }

    pub fn current_context(&self) -> Option<ContextId> {
        self.state.lock().current.clone()
    }

    pub fn url_of(&self, ctx: &ContextId) -> Option<String> {
        self.state.lock().windows.get(ctx).map(|w| w.url.clone())
    }

    pub fn element_value(&self, ctx: &ContextId, element: &ElementId) -> Option<String> {
        self.state
            .lock()
            .windows
            .get(ctx)
            .and_then(|w| w.elements.iter().find(|el| &el.id == element))
            .map(|el| el.value.clone())
    }
}

#[async_trait]
impl WireDriver for FakeDriver {
    async fn status(&self) -> Result<(), DriverError> {
        self.ensure_alive()
    }

    async fn open_window(&self, url: &str) -> Result<ContextId, DriverError> {
        self.ensure_alive()?;
        let ctx = self.add_window(url);
        self.state.lock().current = Some(ctx.clone());
        Ok(ctx)
    }

    async fn navigate(&self, ctx: &ContextId, url: &str) -> Result<(), DriverError> {
        self.ensure_alive()?;
        let mut state = self.state.lock();
        state.window_mut(ctx)?.url = url.to_string();
        state.current = Some(ctx.clone());
        Ok(())
    }

    async fn current_url(&self, ctx: &ContextId) -> Result<String, DriverError> {
        self.ensure_alive()?;
        Ok(self.state.lock().window(ctx)?.url.clone())
    }

    async fn window_handles(&self) -> Result<Vec<ContextId>, DriverError> {
        self.ensure_alive()?;
        let mut state = self.state.lock();
        let mut still_pending = Vec::new();
        for mut pending in std::mem::take(&mut state.pending) {
            if pending.polls_left == 0 {
                state.windows.insert(pending.ctx.clone(), pending.window);
            } else {
                pending.polls_left -= 1;
                still_pending.push(pending);
            }
        }
        state.pending = still_pending;
        Ok(state.windows.keys().cloned().collect())
    }

    async fn switch_to(&self, ctx: &ContextId) -> Result<(), DriverError> {
        self.ensure_alive()?;
        let mut state = self.state.lock();
        state.window(ctx)?;
        state.current = Some(ctx.clone());
        Ok(())
    }

    async fn close_window(&self, ctx: &ContextId) -> Result<(), DriverError> {
        self.ensure_alive()?;
        let mut state = self.state.lock();
        state.window(ctx)?;
        state.windows.remove(ctx);
        if state.current.as_ref() == Some(ctx) {
            state.current = None;
        }
        Ok(())
    }

    async fn find(
        &self,
        ctx: &ContextId,
        selector: &Selector,
    ) -> Result<Vec<ElementId>, DriverError> {
        self.ensure_alive()?;
        let mut state = self.state.lock();
        let window = state.window_mut(ctx)?;
        let mut found = Vec::new();
        for el in window.elements.iter_mut().filter(|el| el.matches(selector)) {
            if el.reveal_in == 0 {
                found.push(el.id.clone());
            } else {
                el.reveal_in -= 1;
            }
        }
        Ok(found)
    }

    async fn is_displayed(
        &self,
        ctx: &ContextId,
        element: &ElementId,
    ) -> Result<bool, DriverError> {
        self.ensure_alive()?;
        let mut state = self.state.lock();
        let el = state.element_mut(ctx, element)?;
        if el.visible_in > 0 {
            el.visible_in -= 1;
            return Ok(false);
        }
        Ok(el.spec.visible)
    }

    async fn is_enabled(
        &self,
        ctx: &ContextId,
        element: &ElementId,
    ) -> Result<bool, DriverError> {
        self.ensure_alive()?;
        let mut state = self.state.lock();
        Ok(state.element_mut(ctx, element)?.spec.enabled)
    }

    async fn click(&self, ctx: &ContextId, element: &ElementId) -> Result<(), DriverError> {
        self.ensure_alive()?;
        let mut state = self.state.lock();
        let el = state.element_mut(ctx, element)?;
        if !el.spec.visible {
            return Err(DriverError::new(DriverErrorKind::NotInteractable)
                .with_hint(format!("element {} is not visible", el.describe())));
        }
        let describe = el.describe();
        let effects = el.spec.on_click.clone();
        state.clicks.push(describe);
        state.apply_effects(ctx, effects);
        Ok(())
    }

    async fn clear(&self, ctx: &ContextId, element: &ElementId) -> Result<(), DriverError> {
        self.ensure_alive()?;
        let mut state = self.state.lock();
        state.element_mut(ctx, element)?.value.clear();
        Ok(())
    }

    async fn send_text(
        &self,
        ctx: &ContextId,
        element: &ElementId,
        text: &str,
    ) -> Result<(), DriverError> {
        self.ensure_alive()?;
        let mut state = self.state.lock();
        let el = state.element_mut(ctx, element)?;
        if !el.spec.enabled {
            return Err(DriverError::new(DriverErrorKind::NotInteractable)
                .with_hint(format!("element {} is disabled", el.describe())));
        }
        el.value.push_str(text);
        let describe = el.describe();
        state.typed.push((describe, text.to_string()));
        Ok(())
    }

    async fn active_element(&self, ctx: &ContextId) -> Result<Option<ElementId>, DriverError> {
        self.ensure_alive()?;
        let state = self.state.lock();
        let Some(index) = state.focused_index(ctx)? else {
            return Ok(None);
        };
        Ok(state
            .window(ctx)?
            .elements
            .get(index)
            .map(|el| el.id.clone()))
    }

    async fn identity_tags(
        &self,
        ctx: &ContextId,
        element: &ElementId,
    ) -> Result<Vec<String>, DriverError> {
        self.ensure_alive()?;
        let mut state = self.state.lock();
        let el = state.element_mut(ctx, element)?;
        let mut tags = Vec::new();
        if let Some(own) = &el.spec.test_id {
            tags.push(own.clone());
        }
        tags.extend(el.spec.child_tags.iter().cloned());
        Ok(tags)
    }

    async fn attribute(
        &self,
        ctx: &ContextId,
        element: &ElementId,
        name: &str,
    ) -> Result<Option<String>, DriverError> {
        self.ensure_alive()?;
        let mut state = self.state.lock();
        let el = state.element_mut(ctx, element)?;
        Ok(match name {
            "data-testid" => el.spec.test_id.clone(),
            "id" => el.spec.dom_id.clone(),
            "value" => Some(el.value.clone()),
            _ => None,
        })
    }

    async fn text(&self, ctx: &ContextId, element: &ElementId) -> Result<String, DriverError> {
        self.ensure_alive()?;
        let mut state = self.state.lock();
        Ok(state.element_mut(ctx, element)?.spec.text.clone())
    }

    async fn document_ready(&self, ctx: &ContextId) -> Result<bool, DriverError> {
        self.ensure_alive()?;
        let mut state = self.state.lock();
        let window = state.window_mut(ctx)?;
        if window.ready_in > 0 {
            window.ready_in -= 1;
            return Ok(false);
        }
        Ok(true)
    }

    async fn dispatch_keys(
        &self,
        ctx: &ContextId,
        sequence: &KeySequence,
    ) -> Result<(), DriverError> {
        self.ensure_alive()?;
        let mut state = self.state.lock();
        state.window(ctx)?;

        let tab = Key::Tab.code();
        let enter = Key::Enter.code();
        let ret = Key::Return.code();
        let modifiers = [
            Key::Shift.code(),
            Key::Control.code(),
            Key::Alt.code(),
            Key::Meta.code(),
        ];

        let mut typed_run = String::new();
        let mut effects: Vec<FakeEffect> = Vec::new();

        for pulse in sequence.pulses() {
            state.key_log.push(*pulse);
            match pulse {
                KeyPulse::Down(c) => {
                    if modifiers.contains(c) {
                        let window = state.window_mut(ctx)?;
                        window.held.push(*c);
                    } else if !state.window(ctx)?.held.is_empty() {
                        let window = state.window_mut(ctx)?;
                        let held = window.held.clone();
                        for (modifier, key, effect) in window.chords.clone() {
                            if held.contains(&modifier) && key == *c {
                                effects.push(effect);
                            }
                        }
                    } else if *c == tab {
                        let window = state.window_mut(ctx)?;
                        if !window.tab_order.is_empty() {
                            let next = window.focus.map(|i| i + 1).unwrap_or(0);
                            window.focus = Some(next % window.tab_order.len());
                        }
                    } else if *c == enter || *c == ret {
                        if let Some(index) = state.focused_index(ctx)? {
                            let activated = state
                                .window(ctx)?
                                .elements
                                .get(index)
                                .map(|el| (el.describe(), el.spec.on_activate.clone()));
                            if let Some((describe, activate)) = activated {
                                state.activations.push(describe);
                                effects.extend(activate);
                            }
                        }
                    } else if !(*c as u32 >= 0xe000 && *c as u32 <= 0xf8ff) {
                        typed_run.push(*c);
                        if let Some(index) = state.focused_index(ctx)? {
                            let window = state.window_mut(ctx)?;
                            if let Some(el) = window.elements.get_mut(index) {
                                el.value.push(*c);
                            }
                        }
                    }
                }
                KeyPulse::Up(c) => {
                    if modifiers.contains(c) {
                        let window = state.window_mut(ctx)?;
                        window.held.retain(|held| held != c);
                    }
                }
            }
        }

        if !typed_run.is_empty() {
            let target = match state.focused_index(ctx)? {
                Some(index) => state
                    .window(ctx)?
                    .elements
                    .get(index)
                    .map(|el| el.describe())
                    .unwrap_or_else(|| "focused".to_string()),
                None => "focused".to_string(),
            };
            state.typed.push((target, typed_run));
        }

        state.apply_effects(ctx, effects);
        Ok(())
    }

    async fn screenshot(&self, ctx: &ContextId) -> Result<Vec<u8>, DriverError> {
        self.ensure_alive()?;
        let state = self.state.lock();
        let window = state.window(ctx)?;
        let mut bytes = vec![0x89, b'P', b'N', b'G', 0x0d, 0x0a, 0x1a, 0x0a];
        bytes.extend_from_slice(window.url.as_bytes());
        Ok(bytes)
    }

    async fn quit(&self) -> Result<(), DriverError> {
        self.alive.store(false, Ordering::SeqCst);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx_and_driver() -> (FakeDriver, ContextId) {
        let driver = FakeDriver::new();
        let ctx = driver.add_window("https://wallet.test/popup.html#/home");
        (driver, ctx)
    }

    #[tokio::test]
    async fn find_respects_reveal_delay() {
        let (driver, ctx) = ctx_and_driver();
        driver.add_element(
            &ctx,
            ElementSpec::new().with_test_id("late").reveal_after(2),
        );
        let sel = Selector::test_id("late");
        assert!(driver.find(&ctx, &sel).await.unwrap().is_empty());
        assert!(driver.find(&ctx, &sel).await.unwrap().is_empty());
        assert_eq!(driver.find(&ctx, &sel).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn pending_windows_materialize_after_polls() {
        let (driver, _ctx) = ctx_and_driver();
        let popup = driver.schedule_window("https://wallet.test/notification.html", 2);
        assert_eq!(driver.window_handles().await.unwrap().len(), 1);
        assert_eq!(driver.window_handles().await.unwrap().len(), 1);
        let handles = driver.window_handles().await.unwrap();
        assert!(handles.contains(&popup));
    }

    #[tokio::test]
    async fn tab_advances_focus_and_enter_activates() {
        let (driver, ctx) = ctx_and_driver();
        driver.add_element(&ctx, ElementSpec::new().with_test_id("first"));
        driver.add_element(
            &ctx,
            ElementSpec::new()
                .with_test_id("second")
                .on_activate(FakeEffect::SetUrl("https://wallet.test/#/send".into())),
        );
        driver.set_tab_order(&ctx, &["first", "second"]);

        let tab = KeySequence::tap(KeyInput::Named(Key::Tab));
        driver.dispatch_keys(&ctx, &tab).await.unwrap();
        driver.dispatch_keys(&ctx, &tab).await.unwrap();
        driver
            .dispatch_keys(&ctx, &KeySequence::tap(KeyInput::Named(Key::Enter)))
            .await
            .unwrap();

        assert_eq!(driver.activations(), vec!["second".to_string()]);
        assert_eq!(
            driver.url_of(&ctx).unwrap(),
            "https://wallet.test/#/send".to_string()
        );
    }

    #[tokio::test]
    async fn chord_triggers_registered_effect() {
        let (driver, ctx) = ctx_and_driver();
        driver.add_element(&ctx, ElementSpec::new().with_test_id("row"));
        driver.set_tab_order(&ctx, &["row"]);
        driver.on_chord(
            &ctx,
            Key::Meta,
            KeyInput::Named(Key::Enter),
            FakeEffect::SetUrl("https://wallet.test/#/send".into()),
        );

        driver
            .dispatch_keys(&ctx, &KeySequence::tap(KeyInput::Named(Key::Tab)))
            .await
            .unwrap();
        driver
            .dispatch_keys(
                &ctx,
                &KeySequence::chord(Key::Meta, KeyInput::Named(Key::Enter)),
            )
            .await
            .unwrap();

        assert!(driver.url_of(&ctx).unwrap().contains("send"));
        // The chord must not double-fire as a plain activation.
        assert!(driver.activations().is_empty());
    }

    #[tokio::test]
    async fn killed_session_surfaces_session_lost() {
        let (driver, ctx) = ctx_and_driver();
        driver.kill();
        let err = driver.current_url(&ctx).await.unwrap_err();
        assert_eq!(err.kind, DriverErrorKind::SessionLost);
    }
}
