use crate::RegionCommands;
use crate::output;
use cloudmux_core::{ControlPlane, RegionRecord};
use colored::Colorize;

pub async fn handle(plane: &ControlPlane, cmd: RegionCommands, json: bool) -> anyhow::Result<()> {
    match cmd {
        RegionCommands::Register {
            name,
            provider,
            key_values,
            zones,
        } => {
            let record = plane
                .info()
                .register_region(RegionRecord {
                    region_name: name,
                    provider_name: provider,
                    key_value_info_list: key_values,
                    available_zone_list: zones,
                })
                .await?;
            if json {
                output::print_json(&record)?;
            } else {
                output::success(format!(
                    "Registered region {} ({})",
                    record.region_name.cyan(),
                    record.provider_name
                ));
            }
        }
        RegionCommands::List => {
            let records = plane.info().list_regions().await?;
            if json {
                return output::print_json(&records);
            }
            if records.is_empty() {
                output::empty("regions");
                return Ok(());
            }
            output::header(&format!("{:<24} {:<12} {}", "NAME", "PROVIDER", "SETTINGS"));
            for r in records {
                let settings: Vec<String> = r
                    .key_value_info_list
                    .iter()
                    .map(|kv| format!("{}={}", kv.key, kv.value))
                    .collect();
                println!(
                    "{:<24} {:<12} {}",
                    r.region_name.cyan(),
                    r.provider_name,
                    settings.join(" ").dimmed()
                );
            }
        }
        RegionCommands::Delete { name } => {
            plane.info().unregister_region(&name).await?;
            if !json {
                output::success(format!("Unregistered region {}", name.cyan()));
            }
        }
    }
    Ok(())
}
