//! Presentation module split across logical submodules: the terminal event
//! loop, the central `App` state machine, per-screen state, and form state.

mod app;
mod forms;
mod helpers;
mod screens;
mod terminal;

pub use app::App;
pub use terminal::run_app;
