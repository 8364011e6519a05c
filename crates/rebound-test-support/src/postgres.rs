//! Helpers for launching disposable Postgres databases for integration tests
//! without Docker.

use std::fs;
use std::net::TcpListener;
use std::path::{Path, PathBuf};
use std::process::{Child, Command, Stdio};
use std::str::FromStr;
use std::thread;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use anyhow::{Context, Result, anyhow, bail};
use postgres::NoTls;
use url::Url;

const ENV_EXTERNAL_URL: &str = "REBOUND_TEST_DATABASE_URL";

/// Handle to a disposable Postgres database used in tests.
///
/// Dropping the handle removes the database; when a local server was spawned
/// for it, the server is stopped and its data directory deleted as well.
pub struct TestDatabase {
    connection_string: String,
    admin_url: String,
    database: String,
    server: Option<LocalServer>,
}

impl TestDatabase {
    /// Connection string that can be passed to `sqlx` or other Postgres clients.
    #[must_use]
    pub fn connection_string(&self) -> &str {
        &self.connection_string
    }
}

impl Drop for TestDatabase {
    fn drop(&mut self) {
        // A spawned server dies with the handle, taking its databases along.
        if self.server.is_none() {
            let _ = run_statements(
                &self.admin_url,
                vec![format!("DROP DATABASE IF EXISTS \"{}\"", self.database)],
            );
        }
    }
}

struct LocalServer {
    process: Child,
    data_dir: PathBuf,
}

impl Drop for LocalServer {
    fn drop(&mut self) {
        let _ = self.process.kill();
        let _ = self.process.wait();
        let _ = fs::remove_dir_all(&self.data_dir);
    }
}

/// Start a disposable Postgres database.
///
/// Prefers an externally supplied connection string via
/// `REBOUND_TEST_DATABASE_URL`, creating a uniquely named database on that
/// server per call. When unset, locally installed Postgres binaries
/// (`initdb`, `postgres`, `pg_isready`) are used to spawn a temporary server.
/// Tests decide whether to skip when this helper returns an error.
///
/// # Errors
///
/// Returns an error if no external URL is provided and Postgres binaries are
/// unavailable or fail to start.
pub fn start_postgres() -> Result<TestDatabase> {
    if let Ok(url) = std::env::var(ENV_EXTERNAL_URL) {
        return attach_database(&url, None);
    }

    let (server, port) = spawn_local_server()?;
    let base_url = format!("postgres://postgres@127.0.0.1:{port}/postgres");
    attach_database(&base_url, Some(server))
}

fn attach_database(base_url: &str, server: Option<LocalServer>) -> Result<TestDatabase> {
    let parsed = Url::parse(base_url).context("invalid postgres connection url")?;
    let database = unique_database_name();

    let mut connection_url = parsed.clone();
    connection_url.set_path(&format!("/{database}"));

    let mut admin = parsed.clone();
    admin.set_path("/postgres");
    let mut candidates = vec![admin.to_string()];
    if admin.path() != parsed.path() {
        candidates.push(parsed.to_string());
    }

    let create = format!("CREATE DATABASE \"{database}\"");
    let mut chosen: Option<String> = None;
    let mut last_error: Option<anyhow::Error> = None;
    for candidate in candidates {
        match run_statements(&candidate, vec![create.clone()]) {
            Ok(()) => {
                chosen = Some(candidate);
                break;
            }
            Err(err) => last_error = Some(err),
        }
    }

    let Some(admin_url) = chosen else {
        return Err(last_error.unwrap_or_else(|| anyhow!("failed to create test database")));
    };

    Ok(TestDatabase {
        connection_string: connection_url.to_string(),
        admin_url,
        database,
        server,
    })
}

fn spawn_local_server() -> Result<(LocalServer, u16)> {
    let initdb = find_binary("initdb")?;
    let postgres_bin = find_binary("postgres")?;
    let pg_isready = find_binary("pg_isready")?;

    let port = free_port()?;
    let data_dir = scratch_data_dir()?;
    let data_dir_arg = data_dir
        .to_str()
        .context("data dir contains non-utf8 characters")?
        .to_string();

    let initdb_status = Command::new(&initdb)
        .args(["-D", &data_dir_arg, "--username=postgres", "--auth=trust"])
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .context("failed to run initdb")?;
    if !initdb_status.success() {
        let _ = fs::remove_dir_all(&data_dir);
        bail!("initdb exited with failure status");
    }

    let process = Command::new(&postgres_bin)
        .args([
            "-D",
            &data_dir_arg,
            "-p",
            &port.to_string(),
            "-h",
            "127.0.0.1",
        ])
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()
        .context("failed to start postgres process")?;
    let server = LocalServer { process, data_dir };

    wait_until_ready(&pg_isready, port)?;

    Ok((server, port))
}

fn find_binary(name: &str) -> Result<PathBuf> {
    let mut search: Vec<PathBuf> = std::env::var_os("PATH")
        .map_or_else(Vec::new, |paths| std::env::split_paths(&paths).collect());
    // Debian and RHEL keep the server binaries out of PATH.
    for version in ["17", "16", "15", "14"] {
        search.push(PathBuf::from(format!("/usr/lib/postgresql/{version}/bin")));
        search.push(PathBuf::from(format!("/usr/pgsql-{version}/bin")));
    }
    search.push(PathBuf::from("/usr/local/bin"));

    for dir in search {
        let candidate = dir.join(name);
        if candidate.exists() {
            return Ok(candidate);
        }
    }

    bail!("{name} binary is required for Postgres-backed tests");
}

fn free_port() -> Result<u16> {
    let listener = TcpListener::bind("127.0.0.1:0").context("failed to reserve port")?;
    let port = listener
        .local_addr()
        .context("failed to read listener address")?
        .port();
    drop(listener);
    Ok(port)
}

fn scratch_data_dir() -> Result<PathBuf> {
    let base = std::env::temp_dir().join("rebound-pg");
    fs::create_dir_all(&base)
        .with_context(|| format!("failed to create base dir {}", base.display()))?;
    for attempt in 0..5 {
        let suffix = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_nanos();
        let candidate = base.join(format!("data-{suffix}-{attempt}"));
        if !candidate.exists() {
            fs::create_dir_all(&candidate)
                .with_context(|| format!("failed to create data dir {}", candidate.display()))?;
            return Ok(candidate);
        }
    }

    bail!("failed to allocate temporary data directory for postgres");
}

fn wait_until_ready(pg_isready: &Path, port: u16) -> Result<()> {
    for _ in 0..30 {
        let status = Command::new(pg_isready)
            .args(["-h", "127.0.0.1", "-p", &port.to_string(), "-U", "postgres"])
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status();
        if matches!(status, Ok(ref s) if s.success()) {
            return Ok(());
        }
        thread::sleep(Duration::from_millis(200));
    }

    bail!("postgres process did not become ready in time")
}

/// Execute a batch of SQL statements against `url` on a fresh connection.
///
/// The synchronous `postgres` client drives its own runtime, so the work runs
/// on a dedicated thread to stay safe inside `tokio` tests.
pub(crate) fn run_statements(url: &str, statements: Vec<String>) -> Result<()> {
    let url = url.to_string();
    thread::spawn(move || -> Result<()> {
        let config = postgres::Config::from_str(&url)?;
        let mut client = config.connect(NoTls)?;
        for statement in &statements {
            client
                .simple_query(statement)
                .map(|_| ())
                .with_context(|| format!("failed to execute fixture statement: {statement}"))?;
        }
        Ok(())
    })
    .join()
    .unwrap_or_else(|_| Err(anyhow!("postgres statement thread panicked")))
}

fn unique_database_name() -> String {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_nanos();
    let pid = std::process::id();
    format!("rebound_test_{pid}_{nanos}")
}
