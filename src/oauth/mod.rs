mod config;
mod flow;
mod handlers;
mod install;

pub use config::OAuthConfig;
pub use flow::OAuthFlow;
pub use handlers::{
    DefaultOAuthFailureHandler, DefaultOAuthSuccessHandler, OAuthFailureHandler,
    OAuthSuccessHandler,
};
