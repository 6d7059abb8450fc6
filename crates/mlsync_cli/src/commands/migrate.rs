use clap::Subcommand;
use mlsync::db;
use mlsync::migration::{Migrator, MigratorTrait};

#[derive(Subcommand)]
pub(crate) enum MigrateAction {
    /// Apply all pending migrations
    Up,
    /// Roll back the last migration
    Down,
    /// List migrations and whether each is applied
    Status,
    /// Drop every table and reapply all migrations (destroys synced data)
    Fresh,
}

/// Handle the migrate command.
pub(crate) async fn handle_migrate(
    action: MigrateAction,
    database_url: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    let db = db::connect(database_url).await?;

    match action {
        MigrateAction::Up => {
            let pending = Migrator::get_pending_migrations(&db).await?.len();
            if pending == 0 {
                println!("Schema is up to date.");
                return Ok(());
            }
            println!("Applying {} migration(s)...", pending);
            Migrator::up(&db, None).await?;
            println!("Migrations applied.");
        }
        MigrateAction::Down => {
            Migrator::down(&db, Some(1)).await?;
            println!("Rolled back the last migration.");
        }
        MigrateAction::Status => {
            for migration in Migrator::get_migration_with_status(&db).await? {
                println!("{:<10} {}", migration.status().to_string(), migration.name());
            }
        }
        MigrateAction::Fresh => {
            tracing::warn!(database_url, "Dropping every table, watermarks and run history included");
            Migrator::fresh(&db).await?;
            println!("Schema recreated.");
        }
    }

    Ok(())
}
