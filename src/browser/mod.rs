pub mod webdriver;

pub use webdriver::{Locator, Session, WebDriver};
