//! Profile commands
//!
//! Handles: profstore list/show/create/update/delete/set-default/active/
//! export/import/use-repo/rebuild-index/duplicate

use std::path::PathBuf;

use anyhow::{bail, Context};
use clap::{Args, Subcommand};
use serde_json::json;

use profstore_core::profile::{
    ConnectionUpdate, CreateProfileRequest, EnvironmentVariable, Profile, ProfileIndexEntry,
    ProfileUpdate, REDACTED_CREDENTIAL,
};
use profstore_core::ProfileStore;

#[derive(Subcommand)]
pub enum ProfileCommands {
    /// List all profiles
    List,
    /// Show profile details
    Show {
        /// Profile ID
        id: String,
    },
    /// Create a new profile
    Create(CreateArgs),
    /// Update fields of a profile
    Update(UpdateArgs),
    /// Delete a profile
    Delete {
        /// Profile ID
        id: String,
    },
    /// Make a profile the default
    SetDefault {
        /// Profile ID
        id: String,
    },
    /// Show the active profile
    Active {
        /// Prefer this profile if it exists
        #[arg(long)]
        profile: Option<String>,
    },
    /// Export a profile as JSON with its credential redacted
    Export {
        /// Profile ID
        id: String,
        /// Output file (defaults to stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Import a profile from an exported JSON file
    Import {
        /// Exported profile file
        file: PathBuf,
        /// Show what would be imported without importing
        #[arg(long)]
        dry_run: bool,
    },
    /// Record that a repository was used with a profile
    UseRepo {
        /// Profile ID
        id: String,
        /// Repository as org/name
        repository: String,
    },
    /// Rebuild the profile index from the stored records
    RebuildIndex,
    /// Copy a profile under a new ID
    Duplicate {
        /// Profile ID
        id: String,
        /// Name for the copy (defaults to "<name> (copy)")
        #[arg(long)]
        name: Option<String>,
    },
}

#[derive(Args)]
pub struct CreateArgs {
    /// Profile name
    pub name: String,
    /// Service endpoint URL
    #[arg(long)]
    pub endpoint: String,
    /// Credential for the endpoint
    #[arg(long)]
    pub credential: Option<String>,
    /// Request timeout in milliseconds
    #[arg(long)]
    pub timeout_ms: Option<u64>,
    /// Optional description
    #[arg(short, long)]
    pub description: Option<String>,
    /// Make this the default profile
    #[arg(long)]
    pub default: bool,
    /// Environment variable as KEY=VALUE (repeatable)
    #[arg(long = "env", value_name = "KEY=VALUE")]
    pub env: Vec<String>,
    /// Organization scope (repeatable)
    #[arg(long = "org", value_name = "ORG")]
    pub orgs: Vec<String>,
}

#[derive(Args)]
pub struct UpdateArgs {
    /// Profile ID
    pub id: String,
    /// New name
    #[arg(long)]
    pub name: Option<String>,
    /// New endpoint URL
    #[arg(long)]
    pub endpoint: Option<String>,
    /// New credential (empty clears it)
    #[arg(long)]
    pub credential: Option<String>,
    /// New timeout in milliseconds
    #[arg(long)]
    pub timeout_ms: Option<u64>,
    /// New description (empty clears it)
    #[arg(short, long)]
    pub description: Option<String>,
    /// New system prompt (empty clears it)
    #[arg(long)]
    pub system_prompt: Option<String>,
    /// Replace environment variables with these KEY=VALUE pairs
    #[arg(long = "env", value_name = "KEY=VALUE")]
    pub env: Vec<String>,
    /// Replace organization scopes
    #[arg(long = "org", value_name = "ORG")]
    pub orgs: Vec<String>,
    /// Enable or disable the connection
    #[arg(long)]
    pub enabled: Option<bool>,
}

/// Execute a profile command
///
/// # Errors
/// Returns the store error, or an I/O error for export/import files
pub fn execute(store: &ProfileStore, command: ProfileCommands, json: bool) -> anyhow::Result<()> {
    match command {
        ProfileCommands::List => {
            let entries = store.list()?;
            if json {
                print_json(&entries)?;
            } else {
                print_entries(&entries);
            }
        }
        ProfileCommands::Show { id } => {
            let Some(profile) = store.get(&id)? else {
                bail!("Profile not found: {id}");
            };
            print_profile(&profile, json)?;
        }
        ProfileCommands::Create(args) => {
            let mut request = CreateProfileRequest {
                description: args.description,
                fixed_organizations: args.orgs,
                environment_variables: parse_env(&args.env)?,
                is_default: args.default,
                ..CreateProfileRequest::new(args.name, args.endpoint)
            };
            request.connection.credential = args.credential;
            request.connection.timeout_ms = args.timeout_ms;

            let profile = store.create(request)?;
            if json {
                print_json(&redacted(&profile))?;
            } else {
                println!("Created profile: {}", profile.id);
            }
        }
        ProfileCommands::Update(args) => {
            let id = args.id.clone();
            let update = build_update(args)?;
            let profile = store.update(&id, update)?;
            if json {
                print_json(&redacted(&profile))?;
            } else {
                println!("Updated profile: {}", profile.id);
            }
        }
        ProfileCommands::Delete { id } => {
            if !store.delete(&id)? {
                bail!("Profile not found: {id}");
            }
            if json {
                print_json(&json!({ "deleted": id }))?;
            } else {
                println!("Deleted profile: {id}");
            }
        }
        ProfileCommands::SetDefault { id } => {
            store.set_default(&id)?;
            if json {
                print_json(&json!({ "default": id }))?;
            } else {
                println!("Default profile: {id}");
            }
        }
        ProfileCommands::Active { profile } => {
            let active = store.active_profile(profile.as_deref())?;
            print_profile(&active, json)?;
        }
        ProfileCommands::Export { id, output } => {
            let exported = store.export(&id)?;
            match output {
                Some(path) => {
                    std::fs::write(&path, exported)
                        .with_context(|| format!("Failed to write {}", path.display()))?;
                    println!("Exported profile to {}", path.display());
                }
                None => println!("{exported}"),
            }
        }
        ProfileCommands::Import { file, dry_run } => {
            let content = std::fs::read_to_string(&file)
                .with_context(|| format!("Failed to read {}", file.display()))?;
            if dry_run {
                let preview = store.preview_import(&content)?;
                if json {
                    print_json(&preview)?;
                } else {
                    println!("Would import profile '{}'", preview.name);
                    println!("  Endpoint: {}", preview.endpoint);
                    println!("  Environment variables: {}", preview.environment_variable_count);
                    println!("  Organizations: {}", preview.organization_count);
                }
                return Ok(());
            }
            let profile = store.import(&content)?;
            if json {
                print_json(&redacted(&profile))?;
            } else {
                println!("Imported profile: {} ({})", profile.id, profile.name);
            }
        }
        ProfileCommands::UseRepo { id, repository } => {
            let profile = store.record_repository_usage(&id, &repository)?;
            if json {
                print_json(&profile.repository_history)?;
            } else {
                println!("Recorded {repository} for profile {}", profile.id);
            }
        }
        ProfileCommands::RebuildIndex => {
            let report = store.rebuild_index()?;
            if json {
                print_json(&json!({
                    "entries": report.entries.len(),
                    "skipped": report.skipped,
                }))?;
            } else {
                println!(
                    "Rebuilt index: {} profiles, {} skipped",
                    report.entries.len(),
                    report.skipped
                );
            }
        }
        ProfileCommands::Duplicate { id, name } => {
            let copy = store.duplicate(&id, name.as_deref())?;
            if json {
                print_json(&redacted(&copy))?;
            } else {
                println!("Created profile: {} ({})", copy.id, copy.name);
            }
        }
    }
    Ok(())
}

fn build_update(args: UpdateArgs) -> anyhow::Result<ProfileUpdate> {
    let connection = ConnectionUpdate {
        endpoint: args.endpoint,
        credential: args.credential,
        timeout_ms: args.timeout_ms,
        enabled: args.enabled,
    };
    Ok(ProfileUpdate {
        name: args.name,
        description: args.description,
        system_prompt: args.system_prompt,
        fixed_organizations: (!args.orgs.is_empty()).then_some(args.orgs),
        environment_variables: if args.env.is_empty() {
            None
        } else {
            Some(parse_env(&args.env)?)
        },
        connection: (!connection.is_empty()).then_some(connection),
        ..ProfileUpdate::default()
    })
}

fn parse_env(pairs: &[String]) -> anyhow::Result<Vec<EnvironmentVariable>> {
    pairs
        .iter()
        .map(|pair| match pair.split_once('=') {
            Some((key, value)) if !key.trim().is_empty() => {
                Ok(EnvironmentVariable::new(key.trim(), value))
            }
            _ => bail!("Invalid environment variable '{pair}', expected KEY=VALUE"),
        })
        .collect()
}

/// Credentials are never printed
fn redacted(profile: &Profile) -> Profile {
    let mut profile = profile.clone();
    if profile.connection.credential.is_some() {
        profile.connection.credential = Some(REDACTED_CREDENTIAL.to_string());
    }
    profile
}

fn print_json<T: serde::Serialize + ?Sized>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn print_entries(entries: &[ProfileIndexEntry]) {
    if entries.is_empty() {
        println!("No profiles found.");
        return;
    }
    println!("Profiles:");
    for entry in entries {
        let marker = if entry.is_default { "*" } else { " " };
        let desc = entry.description.as_deref().unwrap_or("No description");
        println!("{marker} {} - {} ({desc})", entry.id, entry.name);
    }
}

fn print_profile(profile: &Profile, json: bool) -> anyhow::Result<()> {
    if json {
        return print_json(&redacted(profile));
    }

    println!("Profile: {}", profile.name);
    println!("  ID: {}", profile.id);
    if let Some(desc) = &profile.description {
        println!("  Description: {desc}");
    }
    println!("  Default: {}", if profile.is_default { "yes" } else { "no" });
    println!("  Endpoint: {}", profile.connection.endpoint);
    println!(
        "  Credential: {}",
        if profile.connection.credential.is_some() { "set" } else { "none" }
    );
    println!("  Timeout: {} ms", profile.connection.timeout_ms);
    println!(
        "  Enabled: {}",
        if profile.connection.enabled { "yes" } else { "no" }
    );
    if !profile.fixed_organizations.is_empty() {
        println!("  Organizations: {}", profile.fixed_organizations.join(", "));
    }
    if !profile.environment_variables.is_empty() {
        println!("  Environment:");
        for var in &profile.environment_variables {
            println!("    {}={}", var.key, var.value);
        }
    }
    if !profile.repository_history.is_empty() {
        println!("  Recent repositories:");
        for usage in &profile.repository_history {
            println!("    {} ({})", usage.repository, usage.last_used.to_rfc3339());
        }
    }
    println!("  Created: {}", profile.created_at.to_rfc3339());
    println!("  Updated: {}", profile.updated_at.to_rfc3339());
    Ok(())
}
