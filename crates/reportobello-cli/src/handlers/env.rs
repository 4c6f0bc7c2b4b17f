#![deny(clippy::all, clippy::pedantic)]

use crate::args::EnvCmd;
use crate::client::{CliError, Ctx};
use crate::io::parse_env_pairs;
use crate::print::env_lines;

pub async fn handle(ctx: &Ctx, cmd: EnvCmd) -> Result<(), CliError> {
    match cmd {
        EnvCmd::Ls => {
            let vars = ctx.api().env_vars().await?;
            print!("{}", env_lines(&vars));
        }
        EnvCmd::Set { pairs } => {
            let vars = parse_env_pairs(&pairs)?;
            ctx.api().update_env_vars(&vars).await?;
        }
        EnvCmd::Rm { keys } => ctx.api().delete_env_vars(&keys).await?,
    }
    Ok(())
}
