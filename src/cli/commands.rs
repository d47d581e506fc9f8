use std::sync::Arc;
use tracing::{info, warn};
use zeroize::Zeroizing;

use crate::cli::options::{Commands, DeployArgs, EnvCommands, InfralinkCli, SecretCommands};
use crate::cli::output::{print_execution_report, print_providers, print_secret_names};
use crate::config::Settings;
use crate::deploy::{DeployError, DeploymentManager, Result};
use crate::runtime::RuntimeRegistry;
use crate::secrets::{
    format_identity, identity_file_name, init_operator_key, PassphraseSource, PrivateKeySource,
    SecretVault,
};
use crate::types::{Command, FileVersions, FixedVersion, VersionResolver};

/// Run a parsed command line against `registry`.
///
/// Provider crates call this from their own `main` with their runtimes registered.
pub async fn run(cli: InfralinkCli, registry: RuntimeRegistry) -> Result<()> {
    let settings = Settings::from_env(cli.root.clone())?;
    let manager = DeploymentManager::new(settings, registry);

    match &cli.command {
        Commands::Secret { command } => run_secret(manager.settings(), command),
        Commands::Env { command } => run_env(&manager, command).await,
        Commands::Providers => {
            print_providers(manager.registry());
            Ok(())
        }
        Commands::Plan(args) => run_deployment(&manager, Command::Plan, args).await,
        Commands::Apply(args) => run_deployment(&manager, Command::Apply, args).await,
        Commands::Delete(args) => run_deployment(&manager, Command::Delete, args).await,
        Commands::Export(args) => run_deployment(&manager, Command::Export, args).await,
    }
}

async fn run_deployment(manager: &DeploymentManager, command: Command, args: &DeployArgs) -> Result<()> {
    if matches!(command, Command::Apply | Command::Delete) {
        confirm(command, &args.environment, args.confirm.as_deref())?;
    }

    let selector: Arc<dyn VersionResolver> = match &args.version {
        Some(version) => Arc::new(FixedVersion::new(&args.environment, version)),
        None => Arc::new(FileVersions::new(&args.environment, &manager.settings().root)),
    };

    let mut session = manager.settings().key_session();
    let report = manager.execute(command, selector, &mut session).await?;
    print_execution_report(command, &args.environment, &report);
    Ok(())
}

fn confirm(command: Command, env: &str, given: Option<&str>) -> Result<()> {
    if let Some(answer) = given {
        return if answer == "yes" {
            Ok(())
        } else {
            Err(DeployError::Aborted {
                command: command.to_string(),
            })
        };
    }
    let accepted = inquire::Confirm::new(&format!("Really {command} environment {env}?"))
        .with_default(false)
        .prompt()
        .map_err(|e| DeployError::Prompt {
            reason: e.to_string(),
        })?;
    if accepted {
        Ok(())
    } else {
        Err(DeployError::Aborted {
            command: command.to_string(),
        })
    }
}

async fn run_env(manager: &DeploymentManager, command: &EnvCommands) -> Result<()> {
    match command {
        EnvCommands::Init {
            environment,
            context,
            region,
            runtime,
        } => {
            let path = manager
                .init_environment(environment, context, region, runtime)
                .await?;
            println!("✅ Environment {environment} initialised: {}", path.display());
            Ok(())
        }
    }
}

fn run_secret(settings: &Settings, command: &SecretCommands) -> Result<()> {
    let store = settings.secret_store();

    match command {
        SecretCommands::Init {
            environment,
            name,
            email,
        } => {
            let created = match &settings.private_key {
                PrivateKeySource::File(path) if !path.exists() => {
                    let name = text_or_prompt(name.as_deref(), "Your name:")?;
                    let email = text_or_prompt(email.as_deref(), "Your email:")?;
                    let passphrase = match &settings.passphrase {
                        PassphraseSource::Fixed(passphrase) => passphrase.clone(),
                        PassphraseSource::Prompt => new_passphrase()?,
                    };
                    init_operator_key(
                        path,
                        &format_identity(&name, &email),
                        &passphrase,
                        settings.key_options,
                    )?
                }
                _ => None,
            };

            let registered = match created {
                Some(key) => store.init_environment(environment, &key)?,
                None => {
                    let mut session = settings.key_session();
                    let key = session.unlock()?;
                    store.init_environment(environment, key)?
                }
            };
            println!("🔑 Registered {}", registered.display());
            println!(
                "  Commit it, then ask someone with access to run `infralink secret refresh -e {environment}`."
            );
            Ok(())
        }
        SecretCommands::Add {
            environment,
            name,
            value,
            overwrite,
        } => {
            let value = match value {
                Some(value) => Zeroizing::new(value.clone()),
                None => prompt_secret_value(name)?,
            };
            store.add_secret(environment, name, &value, *overwrite)?;
            println!("✅ Secret {environment}/{name} written");
            Ok(())
        }
        SecretCommands::Refresh { environment } => {
            let mut session = settings.key_session();
            let count = SecretVault::new(store, &mut session).refresh(environment)?;
            println!("✅ Re-encrypted {count} secrets of {environment}");
            Ok(())
        }
        SecretCommands::List { environment } => {
            let mut secrets = Vec::new();
            for name in store.list_secret_names(environment)? {
                let readers = store.sealed_for(environment, &name)?;
                secrets.push((name, readers));
            }
            print_secret_names(environment, &secrets);
            Ok(())
        }
        SecretCommands::RemoveKey {
            environment,
            identity,
        } => {
            store.remove_recipient(environment, identity)?;
            info!("Removed {}", identity_file_name(identity));
            warn!("Secrets stay readable by the removed key until `infralink secret refresh -e {}`", environment);
            println!("✅ Removed {identity} from {environment}");
            Ok(())
        }
    }
}

fn text_or_prompt(given: Option<&str>, message: &str) -> Result<String> {
    match given {
        Some(value) => Ok(value.to_string()),
        None => inquire::Text::new(message)
            .prompt()
            .map_err(|e| DeployError::Prompt {
                reason: e.to_string(),
            }),
    }
}

fn new_passphrase() -> Result<Zeroizing<String>> {
    let passphrase = inquire::Password::new("Passphrase for your new private key:")
        .with_custom_confirmation_message("Repeat the passphrase:")
        .prompt()
        .map_err(|e| DeployError::Prompt {
            reason: e.to_string(),
        })?;
    Ok(Zeroizing::new(passphrase))
}

fn prompt_secret_value(name: &str) -> Result<Zeroizing<String>> {
    let value = inquire::Password::new(&format!("Value of {name}:"))
        .prompt()
        .map_err(|e| DeployError::Prompt {
            reason: e.to_string(),
        })?;
    Ok(Zeroizing::new(value))
}
