use crate::ConnectionCommands;
use crate::output;
use cloudmux_core::{ConnectionConfig, ControlPlane};
use colored::Colorize;

fn print_config(config: &ConnectionConfig) {
    println!("{}", config.config_name.cyan().bold());
    println!("  provider:   {}", config.provider_name);
    println!("  driver:     {}", config.driver_name);
    println!("  credential: {}", config.credential_name);
    println!("  region:     {}", config.region_name);
}

pub async fn handle(plane: &ControlPlane, cmd: ConnectionCommands, json: bool) -> anyhow::Result<()> {
    match cmd {
        ConnectionCommands::Create {
            name,
            provider,
            driver,
            credential,
            region,
        } => {
            let config = plane
                .info()
                .create_connection_config(ConnectionConfig {
                    config_name: name,
                    provider_name: provider,
                    driver_name: driver,
                    credential_name: credential,
                    region_name: region,
                })
                .await?;
            if json {
                output::print_json(&config)?;
            } else {
                output::success(format!("Created connection {}", config.config_name.cyan()));
            }
        }
        ConnectionCommands::List => {
            let configs = plane.info().list_connection_configs().await?;
            if json {
                return output::print_json(&configs);
            }
            if configs.is_empty() {
                output::empty("connections");
                return Ok(());
            }
            output::header(&format!(
                "{:<24} {:<12} {:<20} {:<20} {}",
                "NAME", "PROVIDER", "DRIVER", "CREDENTIAL", "REGION"
            ));
            for c in configs {
                println!(
                    "{:<24} {:<12} {:<20} {:<20} {}",
                    c.config_name.cyan(),
                    c.provider_name,
                    c.driver_name,
                    c.credential_name,
                    c.region_name
                );
            }
        }
        ConnectionCommands::Get { name } => {
            let config = plane.info().get_connection_config(&name).await?;
            if json {
                output::print_json(&config)?;
            } else {
                print_config(&config);
            }
        }
        ConnectionCommands::Delete { name } => {
            plane.delete_connection_config(&name).await?;
            if !json {
                output::success(format!("Deleted connection {}", name.cyan()));
            }
        }
    }
    Ok(())
}
