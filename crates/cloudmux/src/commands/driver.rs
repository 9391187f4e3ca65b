use crate::DriverCommands;
use crate::output;
use cloudmux_core::{CloudDriverInfo, ControlPlane};
use colored::Colorize;

pub async fn handle(plane: &ControlPlane, cmd: DriverCommands, json: bool) -> anyhow::Result<()> {
    match cmd {
        DriverCommands::Register {
            name,
            provider,
            lib,
        } => {
            let info = plane
                .register_driver(CloudDriverInfo::new(name, provider, lib))
                .await?;
            if json {
                output::print_json(&info)?;
            } else {
                output::success(format!(
                    "Registered driver {} ({})",
                    info.driver_name.cyan(),
                    info.provider_name
                ));
            }
        }
        DriverCommands::List => {
            let drivers = plane.info().list_drivers().await?;
            if json {
                return output::print_json(&drivers);
            }
            if drivers.is_empty() {
                output::empty("drivers");
                return Ok(());
            }
            output::header(&format!("{:<24} {:<12} {}", "NAME", "PROVIDER", "LIBRARY"));
            for d in drivers {
                println!(
                    "{:<24} {:<12} {}",
                    d.driver_name.cyan(),
                    d.provider_name,
                    d.driver_lib_file_name.dimmed()
                );
            }
        }
        DriverCommands::Delete { name } => {
            plane.unregister_driver(&name).await?;
            if !json {
                output::success(format!("Unregistered driver {}", name.cyan()));
            }
        }
    }
    Ok(())
}
