#![allow(dead_code)]

// In-process test environment: a user directory and a quota service, each on
// an ephemeral port, wired together like the production binaries

use quota_rs::admission::Admission;
use quota_rs::api::ApiServer;
use quota_rs::client::QuotaClient;
use quota_rs::directory::{Directory, HttpDirectory};
use quota_rs::ledger::{LedgerStore, ReplenishPolicy, UserId};
use quota_rs::replenish::Replenisher;
use quota_rs::supervisor::Supervisor;
use quota_rs::sync::{SyncSchedule, UserSync};
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tempfile::TempDir;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;
use user_rs::UserStore;

/// Knobs for one test environment
#[derive(Debug, Clone)]
pub struct TestOptions {
    pub roster: Vec<String>,
    pub default_quota: i64,
    pub policy: ReplenishPolicy,
    pub replenish_interval: Duration,
    pub poll_interval: Duration,
}

impl Default for TestOptions {
    fn default() -> Self {
        Self {
            roster: vec!["Alice".to_string(), "Bob".to_string(), "Carol".to_string()],
            default_quota: 5,
            policy: ReplenishPolicy::new(3, 10),
            // Long enough that replenishment never interferes unless asked for
            replenish_interval: Duration::from_secs(3600),
            poll_interval: Duration::from_millis(50),
        }
    }
}

/// Running quota + user services
pub struct TestEnv {
    pub quota_url: String,
    pub users_url: String,
    pub users: UserStore,
    pub ledger: LedgerStore,
    pub quota: QuotaClient,
    pub http: reqwest::Client,
    shutdown: CancellationToken,
    supervisor: Supervisor,
    user_server: JoinHandle<user_rs::Result<()>>,
    _dir: TempDir,
}

impl TestEnv {
    /// Start both services with default options
    pub async fn start() -> Self {
        Self::start_with(TestOptions::default()).await
    }

    /// Start both services
    pub async fn start_with(options: TestOptions) -> Self {
        let shutdown = CancellationToken::new();

        // User directory
        let users = UserStore::open("sqlite::memory:")
            .await
            .expect("open user store");
        users.seed(&options.roster).await.expect("seed users");

        let user_listener = TcpListener::bind("127.0.0.1:0").await.expect("bind user api");
        let users_url = format!("http://{}", user_listener.local_addr().expect("user addr"));
        let user_server = tokio::spawn(user_rs::api::serve(
            users.clone(),
            user_listener,
            shutdown.clone(),
        ));

        // Quota service
        let dir = TempDir::new().expect("temp dir");
        let database_url = format!("sqlite://{}", dir.path().join("quota.db").display());
        let ledger = LedgerStore::open(&database_url).await.expect("open ledger");

        let directory: Arc<dyn Directory> = Arc::new(
            HttpDirectory::new(&users_url, Duration::from_secs(2)).expect("directory client"),
        );
        let ids = directory.all_ids().await.expect("list users");
        ledger
            .initialize(&ids, options.default_quota)
            .await
            .expect("bootstrap ledger");

        let quota_listener = TcpListener::bind("127.0.0.1:0").await.expect("bind quota api");
        let quota_url = format!("http://{}", quota_listener.local_addr().expect("quota addr"));

        let mut supervisor = Supervisor::new(shutdown.clone());

        let replenisher = Replenisher::new(ledger.clone(), options.policy, options.replenish_interval);
        let token = supervisor.token();
        supervisor.spawn("replenisher", replenisher.run(token));

        let user_sync = UserSync::new(
            ledger.clone(),
            directory,
            options.default_quota,
            SyncSchedule {
                poll_interval: options.poll_interval,
                retry_delay: options.poll_interval,
            },
        );
        let token = supervisor.token();
        supervisor.spawn("user sync", user_sync.run(token));

        let server = ApiServer::new(Admission::new(ledger.clone()));
        let token = supervisor.token();
        supervisor.spawn("api server", server.run(quota_listener, token));

        let http = reqwest::Client::new();
        let quota = QuotaClient::new(http.clone(), &quota_url);

        Self {
            quota_url,
            users_url,
            users,
            ledger,
            quota,
            http,
            shutdown,
            supervisor,
            user_server,
            _dir: dir,
        }
    }

    /// Id the directory assigned to `name`
    pub async fn user_id(&self, name: &str) -> UserId {
        let user = self
            .users
            .by_name(name)
            .await
            .expect("lookup user")
            .unwrap_or_else(|| panic!("no user named {}", name));
        UserId(user.id)
    }

    /// Add a user to the directory while everything is running
    pub async fn add_user(&self, name: &str) -> UserId {
        self.users
            .seed(&[name.to_string()])
            .await
            .expect("add user");
        self.user_id(name).await
    }

    /// Stop everything and check every task exited cleanly
    pub async fn stop(self) {
        self.shutdown.cancel();
        self.supervisor.wait().await.expect("quota tasks");
        self.user_server
            .await
            .expect("user server task")
            .expect("user server");
    }
}

/// Poll `check` until it returns true or `timeout` elapses
pub async fn eventually<F, Fut>(timeout: Duration, mut check: F) -> bool
where
    F: FnMut() -> Fut,
    Fut: Future<Output = bool>,
{
    let start = Instant::now();
    loop {
        if check().await {
            return true;
        }
        if start.elapsed() > timeout {
            return false;
        }
        sleep(Duration::from_millis(25)).await;
    }
}
