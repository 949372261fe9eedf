use colored::Colorize;

use crate::cli::IdentityCommand;
use crate::error::Result;
use crate::identity::SessionIdentity;

/// Handle `confidant identity ...`
///
/// `show` prints the token on its own line so scripts can capture it.
pub fn handle_identity(identity: &SessionIdentity, command: IdentityCommand) -> Result<()> {
    match command {
        IdentityCommand::Show => {
            println!("{}", identity.get_or_create());
        }
        IdentityCommand::Reset => {
            identity.reset()?;
            println!(
                "{}",
                "Session identity cleared. A new one is created on next use.".green()
            );
        }
    }
    Ok(())
}
