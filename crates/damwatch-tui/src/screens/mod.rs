//! Screen components, one per [`ScreenId`].

pub mod dashboard;
pub mod history;
pub mod login;

use damwatch_core::ScreenController;

use crate::component::Component;
use crate::screen::ScreenId;

/// Build every screen, including the login form.
pub fn create_screens(controller: &ScreenController) -> Vec<(ScreenId, Box<dyn Component>)> {
    vec![
        (
            ScreenId::Dashboard,
            Box::new(dashboard::DashboardScreen::new(controller.clone())) as Box<dyn Component>,
        ),
        (
            ScreenId::History,
            Box::new(history::HistoryScreen::new(controller.clone())),
        ),
        (
            ScreenId::Login,
            Box::new(login::LoginScreen::new(controller.clone())),
        ),
    ]
}
