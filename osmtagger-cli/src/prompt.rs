//! Terminal login prompt.

use console::style;
use dialoguer::theme::ColorfulTheme;
use dialoguer::Input;
use osmtagger::osm::{AuthError, LoginPrompt};

/// Shows the authorization URL and reads back the redirect URL the
/// browser lands on.
pub struct TerminalPrompt;

impl LoginPrompt for TerminalPrompt {
    fn authorize(&self, authorize_url: &str) -> Result<String, AuthError> {
        println!();
        println!("{}", style("Open this URL in a browser and grant access:").bold());
        println!("  {}", style(authorize_url).cyan().underlined());
        println!();

        let redirect: String = Input::with_theme(&ColorfulTheme::default())
            .with_prompt("Paste the URL you were redirected to")
            .allow_empty(true)
            .interact_text()
            .map_err(|e| AuthError::Prompt(e.to_string()))?;

        let redirect = redirect.trim();
        if redirect.is_empty() {
            return Err(AuthError::Cancelled);
        }
        Ok(redirect.to_string())
    }
}
