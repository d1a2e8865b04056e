//! Basic example of the rabt DI container.

use std::sync::Arc;
use std::time::Instant;

use rabt::prelude::*;

// === Define your traits and types ===

trait Logger: Send + Sync {
    fn log(&self, msg: &str);
}

struct ConsoleLogger;

impl Logger for ConsoleLogger {
    fn log(&self, msg: &str) {
        println!("[LOG] {msg}");
    }
}

struct Config {
    database_url: String,
}

struct Database {
    url: String,
    logger: Arc<dyn Logger>,
}

impl Database {
    fn query(&self, sql: &str) -> String {
        self.logger.log(&format!("executing: {sql}"));
        format!("results from {}", self.url)
    }
}

struct UserRepository {
    db: Arc<Database>,
}

impl UserRepository {
    fn find_user(&self, id: u64) -> String {
        self.db.query(&format!("SELECT * FROM users WHERE id = {id}"))
    }
}

// === A timing middleware ===

struct Timing;

impl Middleware for Timing {
    fn around(&self, request: &ResolveRequest, next: Next<'_>) -> Result<Instance> {
        let started = Instant::now();
        let result = next.run(request);
        println!("[TIMING] {} resolved in {:?}", request.key, started.elapsed());
        result
    }
}

fn keys() -> (ServiceKey, ServiceKey, ServiceKey, ServiceKey) {
    (
        ServiceKey::of::<Config>(),
        ServiceKey::of::<Arc<dyn Logger>>(),
        ServiceKey::of::<Database>(),
        ServiceKey::of::<UserRepository>(),
    )
}

fn main() -> Result<()> {
    // Initialize tracing (logging)
    tracing_subscriber::fmt()
        .with_env_filter("rabt=debug")
        .init();

    let (config_key, logger_key, db_key, repo_key) = keys();

    // Constructor metadata: which slots each service needs, in order.
    let metadata = StaticMetadata::new()
        .service(
            db_key.clone(),
            vec![
                DependencySlot::new(config_key.clone()),
                DependencySlot::new(logger_key.clone()),
            ],
        )
        .service(repo_key.clone(), vec![DependencySlot::new(db_key.clone())]);

    let container = Container::builder()
        .metadata(metadata)
        .middleware(Timing)
        // Config — constant value
        .constant(Config {
            database_url: "postgres://localhost/myapp".to_string(),
        })
        // Logger — singleton
        .bind(
            Binding::dynamic(logger_key.clone(), || {
                Ok(instance(Arc::new(ConsoleLogger) as Arc<dyn Logger>))
            })
            .in_scope(Scope::Singleton),
        )
        // Database — singleton built from its dependency slots
        .bind(
            Binding::class(db_key.clone(), db_key.clone(), |_, deps| {
                let config = deps.arc::<Config>(0)?;
                let logger = deps.arc::<Arc<dyn Logger>>(1)?;
                Ok(instance(Database {
                    url: config.database_url.clone(),
                    logger: (*logger).clone(),
                }))
            })
            .in_scope(Scope::Singleton),
        )
        // UserRepository — request-scoped
        .bind(
            Binding::class(repo_key.clone(), repo_key.clone(), |_, deps| {
                Ok(instance(UserRepository {
                    db: deps.arc::<Database>(0)?,
                }))
            })
            .in_scope(Scope::Request),
        )
        // Tagged weapons under one symbol identifier
        .bind(
            Binding::dynamic(ServiceKey::symbol("Weapon"), || Ok(instance("sword")))
                .tagged("type", "melee"),
        )
        .bind(
            Binding::dynamic(ServiceKey::symbol("Weapon"), || Ok(instance("bow")))
                .tagged("type", "ranged"),
        )
        .build();

    println!("container built: {container:?}");

    // === Resolve the service graph ===
    let repo = container.get::<UserRepository>()?;
    println!("{}", repo.find_user(42));

    // === Tagged resolution ===
    let melee = container.get_as::<&str>(
        &ServiceKey::symbol("Weapon"),
        &[Qualifier::tagged("type", "melee")],
    )?;
    println!("melee weapon: {melee}");

    let arsenal = container.get_all_as::<&str>(&ServiceKey::symbol("Weapon"))?;
    println!("full arsenal: {arsenal:?}");

    // === Request scope: one repository across several gets ===
    {
        let scope = container.create_scope();
        let first = scope.get::<UserRepository>()?;
        let second = scope.get::<UserRepository>()?;
        println!(
            "same repository within the scope: {}",
            Arc::ptr_eq(&first, &second)
        );
    }
    // scope dropped — request-scoped instances released

    container.teardown();
    Ok(())
}
