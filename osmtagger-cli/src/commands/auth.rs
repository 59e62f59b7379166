//! Login and logout commands.

use console::style;
use osmtagger::config::ConfigFile;

use super::common::start_app;
use crate::error::CliError;

/// Log in interactively and show who the token belongs to.
pub fn login() -> Result<(), CliError> {
    let config = ConfigFile::load()?;
    let app = start_app(&config)?;
    let handle = app.runtime_handle();

    let token = handle.block_on(app.sync().authenticator().login())?;
    let user = handle.block_on(app.sync().api().user_details(&token))?;

    println!(
        "{} as {} (id {})",
        style("Logged in").green().bold(),
        user.display_name,
        user.id
    );
    Ok(())
}

/// Forget the stored token.
pub fn logout() -> Result<(), CliError> {
    let config = ConfigFile::load()?;
    let app = start_app(&config)?;

    if app.sync().authenticator().token().is_none() {
        println!("Not logged in.");
        return Ok(());
    }
    app.sync().authenticator().logout()?;
    println!("Logged out.");
    Ok(())
}
