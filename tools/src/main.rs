//! desk-runner: headless driver for the sales desk engine.
//!
//! Usage:
//!   desk-runner --db desk.db --seed-demo --summary
//!   desk-runner --db desk.db --ipc-mode

use anyhow::Result;
use salesdesk_core::{
    client_directory::ClientFields,
    record_lifecycle::RecordPatch,
    types::Actor,
    Desk,
};
use std::env;
use std::io::{self, BufRead, Write};

#[derive(serde::Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum IpcCommand {
    CreateClient {
        actor_id: String,
        fields: ClientFields,
    },
    SearchPhone {
        phone: String,
    },
    Gate {
        client_id: String,
        salesperson_id: String,
    },
    CreateRecord {
        client_id: String,
        salesperson_id: String,
        opportunity_number: i64,
        fields: RecordPatch,
    },
    RecordsForClient {
        client_id: String,
    },
    Quit,
}

fn main() -> Result<()> {
    env_logger::init();

    let args: Vec<String> = env::args().collect();
    let ipc_mode = args.iter().any(|a| a == "--ipc-mode");
    let seed_demo = args.iter().any(|a| a == "--seed-demo");
    let summary = args.iter().any(|a| a == "--summary");
    let db = args
        .windows(2)
        .find(|w| w[0] == "--db")
        .map(|w| w[1].as_str())
        .unwrap_or(":memory:");

    if !ipc_mode {
        println!("Sales Desk — desk-runner");
        println!("  db: {db}");
        println!();
    }

    let mut desk = Desk::open(db)?;

    if seed_demo {
        seed_demo_data(&mut desk)?;
    }
    if ipc_mode {
        run_ipc_loop(&mut desk)?;
    }
    if summary || !ipc_mode {
        print_summary(&desk)?;
    }

    Ok(())
}

/// Line-delimited JSON command loop over stdin/stdout, for driving the
/// desk from another process.
fn run_ipc_loop(desk: &mut Desk) -> Result<()> {
    let stdin = io::stdin();
    let mut stdout = io::stdout();
    let mut handle = stdin.lock();
    let mut buffer = String::new();

    loop {
        buffer.clear();
        let bytes_read = handle.read_line(&mut buffer)?;
        if bytes_read == 0 {
            break; // EOF
        }

        let cmd: IpcCommand = match serde_json::from_str(&buffer) {
            Ok(c) => c,
            Err(e) => {
                writeln!(stdout, "{}", serde_json::json!({ "error": e.to_string() }))?;
                stdout.flush()?;
                continue;
            }
        };

        let reply = match handle_command(desk, cmd) {
            Some(Ok(value)) => value,
            Some(Err(e)) => serde_json::json!({ "error": e.to_string() }),
            None => break, // Quit
        };
        writeln!(stdout, "{reply}")?;
        stdout.flush()?;
    }
    Ok(())
}

fn handle_command(desk: &mut Desk, cmd: IpcCommand) -> Option<Result<serde_json::Value>> {
    let result = match cmd {
        IpcCommand::Quit => return None,
        IpcCommand::CreateClient { actor_id, fields } => desk
            .create_client(&Actor::salesperson(actor_id), fields)
            .map_err(Into::into)
            .and_then(|c| serde_json::to_value(c).map_err(Into::into)),
        IpcCommand::SearchPhone { phone } => desk
            .search_client_by_phone(&phone)
            .map_err(Into::into)
            .and_then(|c| serde_json::to_value(c).map_err(Into::into)),
        IpcCommand::Gate {
            client_id,
            salesperson_id,
        } => desk
            .can_open_opportunity(&client_id, &salesperson_id)
            .map_err(Into::into)
            .map(|g| {
                serde_json::json!({
                    "allowed": g.allowed,
                    "next_number": g.next_number,
                    "max_number": g.max_number,
                })
            }),
        IpcCommand::CreateRecord {
            client_id,
            salesperson_id,
            opportunity_number,
            fields,
        } => desk
            .create_record(&client_id, &salesperson_id, opportunity_number, fields)
            .map_err(Into::into)
            .and_then(|r| serde_json::to_value(r).map_err(Into::into)),
        IpcCommand::RecordsForClient { client_id } => desk
            .records_for_client(&client_id)
            .map_err(Into::into)
            .and_then(|r| serde_json::to_value(r).map_err(Into::into)),
    };
    Some(result)
}

/// A small realistic data set for poking at a fresh database.
fn seed_demo_data(desk: &mut Desk) -> Result<()> {
    let sp = Actor::salesperson("demo-sp");

    let buyer = desk.create_client(
        &sp,
        ClientFields {
            first_name: Some("Maria".into()),
            last_name: Some("Lopez".into()),
            phone: Some("555-0101".into()),
            email: Some("maria@example.com".into()),
            ..Default::default()
        },
    )?;
    let rec = desk.create_record(&buyer.client_id, &sp.id, 1, RecordPatch::default())?;
    let (cosigner, _edge) = desk.create_and_link_cosigner(
        &sp,
        &buyer.client_id,
        ClientFields {
            first_name: Some("Jorge".into()),
            phone: Some("555-0102".into()),
            ..Default::default()
        },
    )?;

    log::info!(
        "seeded demo data: buyer={} record={} cosigner={}",
        buyer.client_id,
        rec.record_id,
        cosigner.client_id
    );
    Ok(())
}

fn print_summary(desk: &Desk) -> Result<()> {
    let active = desk.active_clients()?.len();
    let trashed = desk.trashed_clients()?.len();
    let records_created = desk.store().event_count("record_created")?;
    let appointments = desk.store().event_count("appointment_scheduled")?;
    let commissions_locked = desk.store().event_count("commission_locked")?;

    println!("=== DESK SUMMARY ===");
    println!("  active clients:     {active}");
    println!("  trashed clients:    {trashed}");
    println!("  records created:    {records_created}");
    println!("  appointments:       {appointments}");
    println!("  commissions locked: {commissions_locked}");
    println!("  notify failures:    {}", desk.notify_failures());
    Ok(())
}
