use crate::CredentialCommands;
use crate::output;
use cloudmux_core::{ControlPlane, CredentialRecord};
use colored::Colorize;
use serde::Serialize;

/// Credential as shown to the operator; values never leave the store
#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
struct CredentialView<'a> {
    credential_name: &'a str,
    provider_name: &'a str,
    keys: Vec<&'a str>,
}

impl<'a> From<&'a CredentialRecord> for CredentialView<'a> {
    fn from(record: &'a CredentialRecord) -> Self {
        Self {
            credential_name: &record.credential_name,
            provider_name: &record.provider_name,
            keys: record
                .key_value_info_list
                .iter()
                .map(|kv| kv.key.as_str())
                .collect(),
        }
    }
}

pub async fn handle(plane: &ControlPlane, cmd: CredentialCommands, json: bool) -> anyhow::Result<()> {
    match cmd {
        CredentialCommands::Register {
            name,
            provider,
            key_values,
        } => {
            let record = plane
                .info()
                .register_credential(CredentialRecord {
                    credential_name: name,
                    provider_name: provider,
                    key_value_info_list: key_values,
                })
                .await?;
            if json {
                output::print_json(&CredentialView::from(&record))?;
            } else {
                output::success(format!(
                    "Registered credential {} ({})",
                    record.credential_name.cyan(),
                    record.provider_name
                ));
            }
        }
        CredentialCommands::List => {
            let records = plane.info().list_credentials().await?;
            let views: Vec<CredentialView> = records.iter().map(CredentialView::from).collect();
            if json {
                return output::print_json(&views);
            }
            if views.is_empty() {
                output::empty("credentials");
                return Ok(());
            }
            output::header(&format!("{:<24} {:<12} {}", "NAME", "PROVIDER", "KEYS"));
            for v in views {
                println!(
                    "{:<24} {:<12} {}",
                    v.credential_name.cyan(),
                    v.provider_name,
                    v.keys.join(", ").dimmed()
                );
            }
        }
        CredentialCommands::Delete { name } => {
            plane.info().unregister_credential(&name).await?;
            if !json {
                output::success(format!("Unregistered credential {}", name.cyan()));
            }
        }
    }
    Ok(())
}
