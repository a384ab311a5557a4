// UI layer: the user-facing flows behind each subcommand, plus the
// spinners, progress bar and colored messages they share.
// Flows stay small and synchronous; the work itself lives in `api`,
// `config` and `push`.

use crate::api::{ApiClient, HttpStorage};
use crate::config::{Config, Context};
use crate::error::{CliError, Result};
use crate::push::{load_local, Pusher};
use crossterm::style::Stylize;
use dialoguer::{Input, Password};
use indicatif::{ProgressBar, ProgressFinish, ProgressStyle};
use std::borrow::Cow;
use std::path::Path;
use std::time::Duration;

const ORG_PAGE_SIZE: u64 = 50;

/// Spinner for one blocking registry call. It clears itself when dropped,
/// so it can be held in a scope guard around a fallible call.
pub fn spinner(msg: impl Into<Cow<'static, str>>, quiet: bool) -> ProgressBar {
    if quiet {
        return ProgressBar::hidden();
    }
    let spinner = ProgressBar::new_spinner().with_finish(ProgressFinish::AndClear);
    spinner.set_style(
        ProgressStyle::with_template("{spinner} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    spinner.set_message(msg);
    spinner.enable_steady_tick(Duration::from_millis(100));
    spinner
}

/// Byte progress bar for the archive upload, in binary units.
pub fn upload_bar(name: &str, total: u64, quiet: bool) -> ProgressBar {
    let bar = if quiet {
        ProgressBar::hidden()
    } else {
        ProgressBar::new(total)
    };
    bar.set_length(total);
    bar.set_style(
        ProgressStyle::with_template(
            "{msg} [{bar:40.cyan/blue}] {binary_bytes}/{binary_total_bytes} ({binary_bytes_per_sec})",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar()),
    );
    bar.set_message(format!("Uploading bento {name}"));
    bar
}

pub fn echo_success(msg: &str) {
    println!("{}", msg.green());
}

pub fn echo_error(msg: &str) {
    eprintln!("{}", msg.red());
}

/// Inputs of `yatai login`. Missing endpoint or token are prompted for.
#[derive(Debug, Clone, Default)]
pub struct LoginArgs {
    pub endpoint: Option<String>,
    pub api_token: Option<String>,
    pub org: Option<String>,
    pub context: String,
    pub quiet: bool,
}

/// Verify the token against the registry, pick the organization and store
/// the context as the current one.
pub fn login(config_path: &Path, args: LoginArgs) -> Result<()> {
    let endpoint = match args.endpoint {
        Some(endpoint) => endpoint,
        None => Input::<String>::new()
            .with_prompt("Yatai endpoint, like https://yatai.io")
            .interact_text()?,
    };
    let api_token = match args.api_token {
        Some(token) => token,
        None => Password::new().with_prompt("Yatai user api token").interact()?,
    };
    if endpoint.trim().is_empty() {
        return Err(CliError::Input("need --endpoint".into()));
    }
    if api_token.trim().is_empty() {
        return Err(CliError::Input("need --api-token".into()));
    }

    let client = ApiClient::new(&endpoint, &api_token)?;
    let user = {
        let _spinner = spinner("Logging in...", args.quiet);
        client.get_current_user()?
    }
    .ok_or_else(|| CliError::Input("the api token does not belong to any user".into()))?;

    let organization = match args.org {
        Some(org) => org,
        None => client
            .list_organizations(0, 1)?
            .items
            .into_iter()
            .next()
            .map(|org| org.name)
            .ok_or_else(|| {
                CliError::Config("no organization available for this user, pass --org".into())
            })?,
    };

    let mut config = Config::load(config_path)?;
    config.add_context(Context {
        name: args.context.clone(),
        endpoint,
        api_token,
        organization: organization.clone(),
    });
    config.current_context_name = args.context;
    config.store(config_path)?;

    echo_success(&format!(
        "login successfully! user: {}, organization: {}",
        user.display_name(),
        organization
    ));
    Ok(())
}

/// Print every organization visible to the current context, marking the
/// one bento commands are scoped to.
pub fn list_organizations(context: &Context, quiet: bool) -> Result<()> {
    let client = context.client()?;
    let mut start = 0;
    loop {
        let page = {
            let _spinner = spinner("Fetching organizations", quiet);
            client.list_organizations(start, ORG_PAGE_SIZE)?
        };
        if page.items.is_empty() {
            break;
        }
        for org in &page.items {
            let marker = if org.name == context.organization { "*" } else { " " };
            let description = org.description.as_deref().unwrap_or("");
            println!("{marker} {:<24} {description}", org.name);
        }
        start += page.items.len() as u64;
        if start >= page.total {
            break;
        }
    }
    Ok(())
}

/// `yatai bento push`. The tag and the local bento are checked before the
/// context store is read, so bad input never needs a login. Success is
/// reported here; a failed upload becomes `CliError::UploadFailed` so the
/// caller exits non-zero.
pub fn push(config_path: &Path, repository: &Path, tag: &str, quiet: bool) -> Result<()> {
    let local = load_local(repository, tag)?;

    let config = Config::load(config_path)?;
    let context = config.current_context()?;
    let org = context.organization()?;
    let registry = context.client()?;
    let storage = HttpStorage::new()?;

    let outcome = Pusher::new(&registry, &storage, org).quiet(quiet).push(&local)?;
    if outcome.is_success() {
        echo_success("Upload successfully");
        Ok(())
    } else {
        Err(CliError::UploadFailed(outcome.reason))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bento::DESCRIPTOR_FILE;
    use tempfile::TempDir;

    #[test]
    fn push_without_version_fails_before_reading_context_store() {
        let home = TempDir::new().unwrap();
        let config_path = home.path().join(".yatai.yaml");
        let repository = home.path().join("repository");

        let err = push(&config_path, &repository, "mymodel", true).unwrap_err();
        assert!(matches!(err, CliError::Input(_)));
        assert!(err.to_string().contains("specify the bento version"));
        assert_eq!(err.exit_code(), 2);
        assert!(!config_path.exists());
    }

    #[test]
    fn push_of_unknown_bento_fails_before_reading_context_store() {
        let home = TempDir::new().unwrap();
        let config_path = home.path().join(".yatai.yaml");
        let repository = home.path().join("repository");
        std::fs::create_dir_all(repository.join("iris").join("1.0")).unwrap();

        let err = push(&config_path, &repository, "iris:1.0", true).unwrap_err();
        assert!(matches!(err, CliError::Input(_)));
        assert!(err.to_string().contains("iris:1.0"));
        assert_eq!(err.exit_code(), 2);
        assert!(!config_path.exists());
    }

    #[test]
    fn push_of_valid_bento_without_login_asks_for_login() {
        let home = TempDir::new().unwrap();
        let config_path = home.path().join(".yatai.yaml");
        let repository = home.path().join("repository");
        let dir = repository.join("iris").join("1.0");
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join(DESCRIPTOR_FILE), "kind: BentoService\n").unwrap();

        let err = push(&config_path, &repository, "iris:1.0", true).unwrap_err();
        assert!(matches!(err, CliError::Config(_)));
        assert!(err.to_string().contains("please login"));
        assert_eq!(err.exit_code(), 1);
    }
}
