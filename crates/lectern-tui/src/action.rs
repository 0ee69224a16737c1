/// User intents produced by [`crate::input::map_event`] and consumed by
/// [`crate::app::App::update`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    None,
    Quit,
    Play,
    Pause,
    Stop,
    /// Switch keyboard focus between the rate and pitch sliders.
    CycleSlider,
    Increase,
    Decrease,
    MoveDown,
    MoveUp,
    PageDown,
    PageUp,
    GoTop,
    GoBottom,
    DrillIn,
    NavigateBack,
    OpenFilePicker,
    ToggleHelp,
    /// Text pasted into the terminal; dropping a file pastes its path.
    Paste(String),
    Tick,
    Resize(u16, u16),
}
