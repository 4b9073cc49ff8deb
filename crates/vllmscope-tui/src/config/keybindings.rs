use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use std::collections::HashMap;

use vllmscope_types::Severity;

use crate::app::{Action, PromptKind, Screen};

/// A key combination
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct KeyBinding {
    pub code: KeyCode,
    pub modifiers: KeyModifiers,
}

impl KeyBinding {
    pub fn new(code: KeyCode) -> Self {
        Self {
            code,
            modifiers: KeyModifiers::NONE,
        }
    }

    pub fn ctrl(code: KeyCode) -> Self {
        Self {
            code,
            modifiers: KeyModifiers::CONTROL,
        }
    }

    /// Normalize a key event
    ///
    /// Terminals disagree on whether an uppercase char carries SHIFT, so it
    /// is dropped for chars and BackTab where the code already encodes it.
    pub fn from_event(event: &KeyEvent) -> Self {
        let mut modifiers = event.modifiers;
        if matches!(event.code, KeyCode::Char(_) | KeyCode::BackTab) {
            modifiers.remove(KeyModifiers::SHIFT);
        }
        Self {
            code: event.code,
            modifiers,
        }
    }
}

/// Context for keybindings
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum KeyContext {
    Global,
    Overview,
    Metrics,
    Logs,
    Inventory,
    Profiles,
    Settings,
    SearchInput,
    PromptInput,
    Confirm,
}

impl KeyContext {
    pub fn for_screen(screen: Screen) -> Self {
        match screen {
            Screen::Overview => Self::Overview,
            Screen::Metrics => Self::Metrics,
            Screen::Logs => Self::Logs,
            Screen::Inventory => Self::Inventory,
            Screen::Profiles => Self::Profiles,
            Screen::Settings => Self::Settings,
        }
    }
}

fn char_key(c: char) -> KeyBinding {
    KeyBinding::new(KeyCode::Char(c))
}

fn list_navigation(map: &mut HashMap<KeyBinding, Action>) {
    map.insert(char_key('j'), Action::ListDown);
    map.insert(KeyBinding::new(KeyCode::Down), Action::ListDown);
    map.insert(char_key('k'), Action::ListUp);
    map.insert(KeyBinding::new(KeyCode::Up), Action::ListUp);
}

/// Keybinding configuration
pub struct KeyBindings {
    bindings: HashMap<KeyContext, HashMap<KeyBinding, Action>>,
}

impl KeyBindings {
    pub fn new() -> Self {
        let mut bindings = HashMap::new();

        // Global bindings
        let mut global = HashMap::new();
        global.insert(char_key('?'), Action::ToggleHelp);
        global.insert(KeyBinding::new(KeyCode::Esc), Action::GoBack);
        global.insert(KeyBinding::ctrl(KeyCode::Char('c')), Action::Quit);
        global.insert(char_key('q'), Action::Quit);
        global.insert(KeyBinding::new(KeyCode::Tab), Action::NextScreen);
        global.insert(KeyBinding::new(KeyCode::BackTab), Action::PrevScreen);
        for (i, screen) in Screen::ALL.iter().enumerate() {
            if let Some(c) = char::from_digit(i as u32 + 1, 10) {
                global.insert(char_key(c), Action::Navigate(*screen));
            }
        }
        global.insert(char_key('r'), Action::Reconnect);
        global.insert(KeyBinding::ctrl(KeyCode::Char('r')), Action::Refresh);
        bindings.insert(KeyContext::Global, global);

        // Cluster controls
        let mut overview = HashMap::new();
        overview.insert(char_key('s'), Action::StartCluster);
        overview.insert(char_key('x'), Action::StopCluster);
        overview.insert(char_key('m'), Action::StopModel);
        overview.insert(char_key('p'), Action::OpenPrompt(PromptKind::SaveProfile));
        bindings.insert(KeyContext::Overview, overview);

        let mut metrics = HashMap::new();
        metrics.insert(char_key('l'), Action::NextMetric);
        metrics.insert(KeyBinding::new(KeyCode::Right), Action::NextMetric);
        metrics.insert(char_key('h'), Action::PrevMetric);
        metrics.insert(KeyBinding::new(KeyCode::Left), Action::PrevMetric);
        bindings.insert(KeyContext::Metrics, metrics);

        // Log viewer bindings - less-like navigation
        let mut logs = HashMap::new();
        // Line navigation
        logs.insert(char_key('j'), Action::ScrollDown(1));
        logs.insert(KeyBinding::new(KeyCode::Down), Action::ScrollDown(1));
        logs.insert(KeyBinding::new(KeyCode::Enter), Action::ScrollDown(1));
        logs.insert(char_key('k'), Action::ScrollUp(1));
        logs.insert(KeyBinding::new(KeyCode::Up), Action::ScrollUp(1));
        // Page navigation (less-style)
        logs.insert(KeyBinding::ctrl(KeyCode::Char('f')), Action::PageDown);
        logs.insert(KeyBinding::ctrl(KeyCode::Char('b')), Action::PageUp);
        logs.insert(KeyBinding::ctrl(KeyCode::Char('d')), Action::PageDown);
        logs.insert(KeyBinding::ctrl(KeyCode::Char('u')), Action::PageUp);
        logs.insert(KeyBinding::new(KeyCode::PageDown), Action::PageDown);
        logs.insert(KeyBinding::new(KeyCode::PageUp), Action::PageUp);
        // Top/bottom navigation (less-style)
        logs.insert(char_key('g'), Action::ScrollToTop);
        logs.insert(char_key('G'), Action::ScrollToBottom);
        logs.insert(KeyBinding::new(KeyCode::Home), Action::ScrollToTop);
        logs.insert(KeyBinding::new(KeyCode::End), Action::ScrollToBottom);
        logs.insert(char_key('f'), Action::ToggleAutoScroll);
        logs.insert(char_key('t'), Action::ToggleTimestamps);
        logs.insert(char_key('s'), Action::ToggleStats);
        logs.insert(char_key('c'), Action::ClearLogs);
        logs.insert(char_key('/'), Action::OpenSearch);
        logs.insert(char_key('n'), Action::ClearFilter);
        logs.insert(char_key('e'), Action::ExportLogs);
        logs.insert(char_key('h'), Action::ToggleHistory);
        logs.insert(char_key('H'), Action::LoadHistory);
        logs.insert(char_key('S'), Action::DownloadLogs);
        // Level toggles
        logs.insert(char_key('D'), Action::ToggleLevel(Severity::Debug));
        logs.insert(char_key('I'), Action::ToggleLevel(Severity::Info));
        logs.insert(char_key('W'), Action::ToggleLevel(Severity::Warning));
        logs.insert(char_key('E'), Action::ToggleLevel(Severity::Error));
        logs.insert(char_key('C'), Action::ToggleLevel(Severity::Critical));
        bindings.insert(KeyContext::Logs, logs);

        let mut inventory = HashMap::new();
        list_navigation(&mut inventory);
        inventory.insert(char_key('d'), Action::DeleteModel);
        inventory.insert(char_key('p'), Action::DistributeModel);
        inventory.insert(char_key('c'), Action::CancelDownload);
        inventory.insert(char_key('v'), Action::ToggleInventoryView);
        inventory.insert(KeyBinding::new(KeyCode::Enter), Action::LaunchModel);
        inventory.insert(char_key('n'), Action::OpenPrompt(PromptKind::DownloadModel));
        bindings.insert(KeyContext::Inventory, inventory);

        let mut profiles = HashMap::new();
        list_navigation(&mut profiles);
        profiles.insert(KeyBinding::new(KeyCode::Enter), Action::LaunchProfile);
        profiles.insert(char_key('f'), Action::ToggleFavorite);
        profiles.insert(char_key('d'), Action::DeleteProfile);
        profiles.insert(char_key('e'), Action::ExportProfiles);
        profiles.insert(char_key('i'), Action::OpenPrompt(PromptKind::ImportProfiles));
        bindings.insert(KeyContext::Profiles, profiles);

        let mut settings = HashMap::new();
        settings.insert(char_key('t'), Action::CycleTheme);
        settings.insert(char_key('f'), Action::CycleRefreshRate);
        settings.insert(char_key('b'), Action::CycleLogBufferSize);
        settings.insert(char_key('R'), Action::ResetSettings);
        settings.insert(char_key('l'), Action::ReloadConfig);
        bindings.insert(KeyContext::Settings, settings);

        // Search input bindings (when search bar is active)
        let mut search = HashMap::new();
        search.insert(KeyBinding::new(KeyCode::Enter), Action::ApplySearch);
        search.insert(KeyBinding::new(KeyCode::Esc), Action::CloseSearch);
        search.insert(KeyBinding::new(KeyCode::Backspace), Action::SearchBackspace);
        search.insert(KeyBinding::ctrl(KeyCode::Char('u')), Action::SearchClear);
        search.insert(KeyBinding::ctrl(KeyCode::Char('c')), Action::CloseSearch);
        bindings.insert(KeyContext::SearchInput, search);

        let mut prompt = HashMap::new();
        prompt.insert(KeyBinding::new(KeyCode::Enter), Action::SubmitPrompt);
        prompt.insert(KeyBinding::new(KeyCode::Esc), Action::CancelPrompt);
        prompt.insert(KeyBinding::new(KeyCode::Backspace), Action::PromptBackspace);
        prompt.insert(KeyBinding::ctrl(KeyCode::Char('c')), Action::CancelPrompt);
        bindings.insert(KeyContext::PromptInput, prompt);

        let mut confirm = HashMap::new();
        confirm.insert(char_key('y'), Action::Confirm);
        confirm.insert(char_key('Y'), Action::Confirm);
        confirm.insert(KeyBinding::new(KeyCode::Enter), Action::Confirm);
        confirm.insert(char_key('n'), Action::CancelConfirm);
        confirm.insert(char_key('N'), Action::CancelConfirm);
        confirm.insert(KeyBinding::new(KeyCode::Esc), Action::CancelConfirm);
        confirm.insert(KeyBinding::ctrl(KeyCode::Char('c')), Action::Quit);
        bindings.insert(KeyContext::Confirm, confirm);

        Self { bindings }
    }

    /// Look up action for key event in given context
    pub fn get_action(&self, context: KeyContext, key: &KeyEvent) -> Option<Action> {
        let binding = KeyBinding::from_event(key);

        // First check context-specific bindings
        if let Some(action) = self
            .bindings
            .get(&context)
            .and_then(|context_bindings| context_bindings.get(&binding))
        {
            return Some(action.clone());
        }

        // Fall back to global bindings
        self.bindings
            .get(&KeyContext::Global)?
            .get(&binding)
            .cloned()
    }

    /// Handle key event in search input mode
    /// Returns Some(Action) for special keys, None for unbound control keys
    pub fn get_search_input_action(&self, key: &KeyEvent) -> Option<Action> {
        self.text_input_action(KeyContext::SearchInput, key, Action::SearchInput)
    }

    /// Handle key event while a text prompt is open
    pub fn get_prompt_input_action(&self, key: &KeyEvent) -> Option<Action> {
        self.text_input_action(KeyContext::PromptInput, key, Action::PromptInput)
    }

    fn text_input_action(
        &self,
        context: KeyContext,
        key: &KeyEvent,
        input: fn(char) -> Action,
    ) -> Option<Action> {
        let binding = KeyBinding::from_event(key);

        if let Some(action) = self
            .bindings
            .get(&context)
            .and_then(|input_bindings| input_bindings.get(&binding))
        {
            return Some(action.clone());
        }

        // Plain characters are typed into the input
        if let KeyCode::Char(c) = key.code {
            if binding.modifiers.is_empty() {
                return Some(input(c));
            }
        }

        None
    }

    /// Handle key event while a confirmation prompt is open
    ///
    /// Nothing but the prompt's own keys gets through.
    pub fn get_confirm_action(&self, key: &KeyEvent) -> Option<Action> {
        let binding = KeyBinding::from_event(key);
        self.bindings
            .get(&KeyContext::Confirm)?
            .get(&binding)
            .cloned()
    }
}

impl Default for KeyBindings {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn shifted(c: char) -> KeyEvent {
        KeyEvent::new(KeyCode::Char(c), KeyModifiers::SHIFT)
    }

    #[test]
    fn test_context_binding_wins_over_global() {
        let kb = KeyBindings::new();
        assert_eq!(
            kb.get_action(KeyContext::Logs, &key(KeyCode::Char('j'))),
            Some(Action::ScrollDown(1))
        );
        assert_eq!(
            kb.get_action(KeyContext::Profiles, &key(KeyCode::Char('j'))),
            Some(Action::ListDown)
        );
    }

    #[test]
    fn test_falls_back_to_global() {
        let kb = KeyBindings::new();
        assert_eq!(
            kb.get_action(KeyContext::Metrics, &key(KeyCode::Char('q'))),
            Some(Action::Quit)
        );
        assert_eq!(
            kb.get_action(KeyContext::Inventory, &key(KeyCode::Char('3'))),
            Some(Action::Navigate(Screen::Logs))
        );
        assert_eq!(
            kb.get_action(KeyContext::Settings, &key(KeyCode::Char('6'))),
            Some(Action::Navigate(Screen::Settings))
        );
    }

    #[test]
    fn test_uppercase_with_or_without_shift() {
        let kb = KeyBindings::new();
        let expected = Some(Action::ToggleLevel(Severity::Error));
        assert_eq!(kb.get_action(KeyContext::Logs, &shifted('E')), expected);
        assert_eq!(
            kb.get_action(KeyContext::Logs, &key(KeyCode::Char('E'))),
            expected
        );
        assert_eq!(
            kb.get_action(
                KeyContext::Global,
                &KeyEvent::new(KeyCode::BackTab, KeyModifiers::SHIFT)
            ),
            Some(Action::PrevScreen)
        );
    }

    #[test]
    fn test_ctrl_r_refreshes() {
        let kb = KeyBindings::new();
        let event = KeyEvent::new(KeyCode::Char('r'), KeyModifiers::CONTROL);
        assert_eq!(
            kb.get_action(KeyContext::Overview, &event),
            Some(Action::Refresh)
        );
        assert_eq!(
            kb.get_action(KeyContext::Overview, &key(KeyCode::Char('r'))),
            Some(Action::Reconnect)
        );
    }

    #[test]
    fn test_search_input_captures_characters() {
        let kb = KeyBindings::new();
        assert_eq!(
            kb.get_search_input_action(&key(KeyCode::Char('q'))),
            Some(Action::SearchInput('q'))
        );
        assert_eq!(
            kb.get_search_input_action(&shifted('Q')),
            Some(Action::SearchInput('Q'))
        );
        assert_eq!(
            kb.get_search_input_action(&key(KeyCode::Esc)),
            Some(Action::CloseSearch)
        );
        let alt = KeyEvent::new(KeyCode::Char('x'), KeyModifiers::ALT);
        assert_eq!(kb.get_search_input_action(&alt), None);
    }

    #[test]
    fn test_prompt_input_types_and_submits() {
        let kb = KeyBindings::new();
        assert_eq!(
            kb.get_prompt_input_action(&key(KeyCode::Char('/'))),
            Some(Action::PromptInput('/'))
        );
        assert_eq!(
            kb.get_prompt_input_action(&key(KeyCode::Enter)),
            Some(Action::SubmitPrompt)
        );
        assert_eq!(
            kb.get_prompt_input_action(&KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL)),
            Some(Action::CancelPrompt)
        );
        assert_eq!(
            kb.get_action(KeyContext::Inventory, &key(KeyCode::Char('n'))),
            Some(Action::OpenPrompt(PromptKind::DownloadModel))
        );
    }

    #[test]
    fn test_confirm_blocks_other_keys() {
        let kb = KeyBindings::new();
        assert_eq!(
            kb.get_confirm_action(&key(KeyCode::Char('y'))),
            Some(Action::Confirm)
        );
        assert_eq!(
            kb.get_confirm_action(&key(KeyCode::Esc)),
            Some(Action::CancelConfirm)
        );
        assert_eq!(kb.get_confirm_action(&key(KeyCode::Char('q'))), None);
    }

    #[test]
    fn test_context_for_screen() {
        for screen in Screen::ALL {
            assert_ne!(KeyContext::for_screen(screen), KeyContext::Global);
        }
        assert_eq!(KeyContext::for_screen(Screen::Logs), KeyContext::Logs);
    }
}
