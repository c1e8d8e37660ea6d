use std::{error::Error, io::Write};

use chrono::{Duration, Utc};
use clap::{Args, Parser, Subcommand, ValueEnum};
use crossterm::{
    cursor,
    event::{self, Event, KeyCode, KeyEvent, KeyModifiers},
    execute,
    style::Print,
    terminal,
    terminal::ClearType,
};
use engine::{Currency, Engine};
use migration::MigratorTrait;
use sea_orm::{Database, DatabaseConnection};

#[derive(Parser, Debug)]
#[command(name = "moneta_admin")]
#[command(about = "Admin utilities for Moneta (users, migrations, recurring jobs)")]
struct Cli {
    /// Database connection string (also read from `DATABASE_URL`).
    #[arg(long, env = "DATABASE_URL", default_value = "sqlite:./moneta.db?mode=rwc")]
    database_url: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    User(User),
    /// Apply or inspect schema migrations.
    Migrate(Migrate),
    Recurring(Recurring),
}

#[derive(Args, Debug)]
struct User {
    #[command(subcommand)]
    command: UserCommand,
}

#[derive(Subcommand, Debug)]
enum UserCommand {
    Create(UserCreateArgs),
}

#[derive(Args, Debug)]
struct UserCreateArgs {
    #[arg(long)]
    email: String,
    #[arg(long)]
    name: Option<String>,
    #[arg(long, default_value = "EUR", value_parser = parse_currency)]
    currency: Currency,
    /// PBKDF2 rounds for the new password hash.
    #[arg(long, default_value_t = engine::DEFAULT_ITERATIONS)]
    password_iterations: u32,
}

#[derive(Args, Debug)]
struct Migrate {
    #[arg(value_enum, default_value_t = MigrateAction::Up)]
    action: MigrateAction,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum MigrateAction {
    Up,
    Down,
    Fresh,
    Status,
}

#[derive(Args, Debug)]
struct Recurring {
    #[command(subcommand)]
    command: RecurringCommand,
}

#[derive(Subcommand, Debug)]
enum RecurringCommand {
    /// Enqueue due rules and process every runnable job once.
    Run(RecurringRunArgs),
    /// Print job counts per status.
    Stats,
}

#[derive(Args, Debug)]
struct RecurringRunArgs {
    #[arg(long, default_value_t = 3)]
    max_attempts: u32,
    #[arg(long, default_value_t = 30)]
    retry_delay_secs: i64,
    /// Reclaim jobs left `active` for longer than this.
    #[arg(long, default_value_t = engine::DEFAULT_JOB_LEASE_SECS)]
    lease_secs: i64,
}

fn parse_currency(raw: &str) -> Result<Currency, String> {
    Currency::try_from(raw).map_err(|err| err.to_string())
}

struct RawModeGuard;

impl RawModeGuard {
    fn enter() -> Result<Self, Box<dyn Error + Send + Sync>> {
        terminal::enable_raw_mode()?;
        Ok(Self)
    }
}

impl Drop for RawModeGuard {
    fn drop(&mut self) {
        let _ = terminal::disable_raw_mode();
    }
}

fn prompt_password(prompt: &str) -> Result<String, Box<dyn Error + Send + Sync>> {
    let _raw = RawModeGuard::enter()?;

    let mut out = std::io::stderr();
    execute!(
        out,
        cursor::MoveToColumn(0),
        terminal::Clear(ClearType::CurrentLine),
        Print(prompt)
    )?;
    out.flush()?;

    let mut buf = String::new();
    loop {
        let Event::Key(KeyEvent {
            code, modifiers, ..
        }) = event::read()?
        else {
            continue;
        };

        match code {
            KeyCode::Enter => {
                execute!(out, Print("\r\n"))?;
                out.flush()?;
                break;
            }
            KeyCode::Backspace => {
                if buf.pop().is_some() {
                    execute!(out, cursor::MoveLeft(1), Print(" "), cursor::MoveLeft(1))?;
                    out.flush()?;
                }
            }
            KeyCode::Char('c') if modifiers.contains(KeyModifiers::CONTROL) => {
                execute!(out, Print("\r\n"))?;
                out.flush()?;
                return Err("interrupted".into());
            }
            KeyCode::Char(ch) if !modifiers.contains(KeyModifiers::CONTROL) => {
                buf.push(ch);
                execute!(out, Print("*"))?;
                out.flush()?;
            }
            _ => {}
        }
    }

    Ok(buf)
}

fn prompt_password_twice() -> Result<String, Box<dyn Error + Send + Sync>> {
    let mut out = std::io::stderr();
    for _ in 0..3 {
        let p1 = prompt_password("Password: ")?;
        if p1.is_empty() {
            execute!(
                out,
                cursor::MoveToColumn(0),
                terminal::Clear(ClearType::CurrentLine),
                Print("Password must not be empty.\r\n")
            )?;
            continue;
        }

        let p2 = prompt_password("Confirm password: ")?;
        if p1 == p2 {
            return Ok(p1);
        }

        execute!(
            out,
            cursor::MoveToColumn(0),
            terminal::Clear(ClearType::CurrentLine),
            Print("Passwords do not match. Try again.\r\n")
        )?;
    }

    Err("too many attempts".into())
}

async fn migrate(db: &DatabaseConnection, action: MigrateAction) -> Result<(), Box<dyn Error + Send + Sync>> {
    match action {
        MigrateAction::Up => migration::Migrator::up(db, None).await?,
        MigrateAction::Down => migration::Migrator::down(db, Some(1)).await?,
        MigrateAction::Fresh => migration::Migrator::fresh(db).await?,
        MigrateAction::Status => {
            for m in migration::Migrator::get_applied_migrations(db).await? {
                println!("applied: {}", m.name());
            }
            for m in migration::Migrator::get_pending_migrations(db).await? {
                println!("pending: {}", m.name());
            }
            return Ok(());
        }
    }
    println!("migrate {action:?}: done");
    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error + Send + Sync>> {
    let cli = Cli::parse();

    let db = Database::connect(&cli.database_url).await?;

    if let Command::Migrate(args) = &cli.command {
        return migrate(&db, args.action).await;
    }
    migration::Migrator::up(&db, None).await?;

    match cli.command {
        Command::User(User {
            command: UserCommand::Create(args),
        }) => {
            let password = prompt_password_twice()?;
            let engine = Engine::builder()
                .database(db)
                .password_iterations(args.password_iterations)
                .build()
                .await?;
            match engine
                .register(&args.email, &password, args.name.as_deref(), Some(args.currency))
                .await
            {
                Ok(user) => println!("created user: {} ({})", user.email, user.id),
                Err(engine::EngineError::ExistingKey(email)) => {
                    eprintln!("user already exists: {email}");
                    std::process::exit(1);
                }
                Err(err) => return Err(err.into()),
            }
        }
        Command::Recurring(Recurring { command }) => {
            let mut builder = Engine::builder().database(db);
            if let RecurringCommand::Run(args) = &command {
                builder = builder.job_lease(Duration::seconds(args.lease_secs));
            }
            let engine = builder.build().await?;
            match command {
                RecurringCommand::Run(args) => {
                    let report = engine
                        .run_recurring(
                            None,
                            Utc::now(),
                            args.max_attempts.max(1),
                            Duration::seconds(args.retry_delay_secs.max(0)),
                        )
                        .await?;
                    println!(
                        "enqueued: {}, completed: {}, failed: {}, transactions created: {}",
                        report.enqueued, report.completed, report.failed, report.materialized
                    );
                }
                RecurringCommand::Stats => {
                    let stats = engine.queue_stats(None).await?;
                    println!(
                        "waiting: {}, active: {}, delayed: {}, completed: {}, failed: {}",
                        stats.waiting, stats.active, stats.delayed, stats.completed, stats.failed
                    );
                }
            }
        }
        Command::Migrate(_) => {}
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn cli_is_well_formed() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_subcommands() {
        let cli = Cli::try_parse_from(["moneta_admin", "migrate", "status"]).unwrap();
        assert!(matches!(
            cli.command,
            Command::Migrate(Migrate {
                action: MigrateAction::Status
            })
        ));

        let cli = Cli::try_parse_from([
            "moneta_admin",
            "user",
            "create",
            "--email",
            "a@example.com",
            "--currency",
            "chf",
        ])
        .unwrap();
        let Command::User(User {
            command: UserCommand::Create(args),
        }) = cli.command
        else {
            panic!("expected user create");
        };
        assert_eq!(args.currency, Currency::Chf);
        assert_eq!(args.name, None);
    }
}
