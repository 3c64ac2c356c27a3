//! ldapback - directory backend command-line tool.

use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use ldapback_core::{DirectoryData, SledStore, TracingAuditLogger};
use ldapback_proto::{DirectoryEntry, ResultCode, SearchRequest};
use ldapback_server::{open_handler, Args, BackendConfig, Command, ConnectionInfo, Datastore, Error};

fn main() -> ExitCode {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "ldapback=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let args = Args::parse();
    match run(args) {
        Ok(code) => code,
        Err(e) => {
            tracing::error!(error = %e, "command failed");
            eprintln!("error: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(args: Args) -> Result<ExitCode, Error> {
    let config = args.config.into_config()?;
    tracing::debug!(
        base_dn = %config.layout.base_dn,
        datastore = ?config.datastore,
        "configuration loaded"
    );

    // Opened per command: import needs exclusive access to the sled directory.
    let open = || open_handler(&config, Arc::new(TracingAuditLogger));
    let conn = ConnectionInfo::local();

    match args.command {
        Command::Import { file } => import(&config, &file),
        Command::User { name, mail } => match open()?.find_user(&name, mail)? {
            Some(user) => print_json(&user),
            None => not_found("user", &name),
        },
        Command::Group { name } => match open()?.find_group(&name)? {
            Some(group) => print_json(&group),
            None => not_found("group", &name),
        },
        Command::Accounts { hierarchy } => {
            let hierarchy = hierarchy.unwrap_or_else(|| config.layout.users_hierarchy.clone());
            print_entries(&open()?.find_posix_accounts(&hierarchy)?);
            Ok(ExitCode::SUCCESS)
        }
        Command::Groups { hierarchy } => {
            let hierarchy = hierarchy.unwrap_or_else(|| config.layout.groups_hierarchy.clone());
            print_entries(&open()?.find_posix_groups(&hierarchy)?);
            Ok(ExitCode::SUCCESS)
        }
        Command::Bind { dn, password } => {
            let handler = open()?;
            let result = handler.bind(&dn, &password, &conn);
            println!("{}", result);
            handler.close(&dn, &conn)?;
            Ok(exit_code(result))
        }
        Command::Search {
            base,
            filter,
            bind_dn,
            password,
            scope,
            attributes,
            size_limit,
        } => {
            let handler = open()?;
            let bind = handler.bind(&bind_dn, &password, &conn);
            if !bind.is_success() {
                println!("# bind: {}", bind);
                return Ok(exit_code(bind));
            }

            let request = SearchRequest::new(base)
                .with_filter(filter)
                .with_scope(scope)
                .with_attributes(attributes)
                .with_size_limit(size_limit);
            let result = handler.search(&bind_dn, &request, &conn);
            print_entries(&result.entries);
            println!("# result: {}", result.result_code);
            handler.close(&bind_dn, &conn)?;

            // A truncated result still delivered entries.
            Ok(match result.result_code {
                ResultCode::SizeLimitExceeded => ExitCode::SUCCESS,
                code => exit_code(code),
            })
        }
    }
}

fn import(config: &BackendConfig, file: &std::path::Path) -> Result<ExitCode, Error> {
    let Datastore::Sled { path } = &config.datastore else {
        return Err(Error::Config(
            "import requires --datastore sled --data <dir>".to_string(),
        ));
    };

    let data = DirectoryData::from_file(file)?;
    let (store, _db) = SledStore::open_path(path)?;
    store.import(&data)?;
    store.flush()?;

    tracing::info!(
        path = %path.display(),
        users = data.users.len(),
        groups = data.groups.len(),
        "directory imported"
    );
    Ok(ExitCode::SUCCESS)
}

fn print_json<T: serde::Serialize>(record: &T) -> Result<ExitCode, Error> {
    let json = serde_json::to_string_pretty(record)
        .map_err(|e| Error::Config(format!("cannot render record: {}", e)))?;
    println!("{}", json);
    Ok(ExitCode::SUCCESS)
}

fn print_entries(entries: &[DirectoryEntry]) {
    for (i, entry) in entries.iter().enumerate() {
        if i > 0 {
            println!();
        }
        print!("{}", entry.to_ldif());
    }
}

fn not_found(kind: &str, name: &str) -> Result<ExitCode, Error> {
    eprintln!("{} not found: {}", kind, name);
    Ok(ExitCode::FAILURE)
}

fn exit_code(result: ResultCode) -> ExitCode {
    if result.is_success() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}
