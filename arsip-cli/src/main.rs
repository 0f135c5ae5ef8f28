use std::{env, fs, io, path::Path, process, thread};

use arsip_core::{
    cache::SnapshotCache,
    caption::{caption_or_fallback, Caption},
    config::Config,
    error::Error,
    record::{Draft, Record, RecordId},
    remote::SheetStore,
    search,
    session::Session,
    sync::{BoardEvent, BoardView, LoadPhase, SyncController},
};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use env_logger::{Builder, Env};

const ENV_LOG: &str = "ARSIP_LOG";
const ENV_LOG_STYLE: &str = "ARSIP_LOG_STYLE";

const USAGE: &str = "usage: arsip <command>

commands:
    login <password>
    logout
    list [term]
    add <image-path> [title] [caption]
    edit <id> <title> <caption>
    delete <id>
    caption <image-path>";

fn main() {
    Builder::from_env(
        Env::new()
            .filter_or(ENV_LOG, "info")
            .write_style(ENV_LOG_STYLE),
    )
    .init();

    // Must happen before any thread is spawned.
    search::local_offset();

    let args: Vec<String> = env::args().skip(1).collect();
    let args: Vec<&str> = args.iter().map(String::as_str).collect();

    if let Err(err) = run(&args) {
        eprintln!("{err}");
        process::exit(1);
    }
}

fn run(args: &[&str]) -> Result<(), Error> {
    let config = Config::load_or_default()?;

    match args {
        ["login", password] => {
            let mut session = Session::restore(config.local_store()?);
            session.login(config.authenticator().as_ref(), password)?;
            println!("Berhasil masuk.");
            Ok(())
        }
        ["logout"] => {
            let mut session = Session::restore(config.local_store()?);
            session.logout()
        }
        ["list"] => list(&config, ""),
        ["list", term] => list(&config, term),
        ["add", path, rest @ ..] if rest.len() <= 2 => {
            add(&config, Path::new(path), rest.first(), rest.get(1))
        }
        ["edit", id, title, caption] => {
            let id = RecordId::from(*id);
            let (title, caption) = (title.to_string(), caption.to_string());
            with_board(&config, "", move |controller, session| {
                controller.load(session)?;
                controller.update(session, &id, &title, &caption)
            })
        }
        ["delete", id] => {
            let id = RecordId::from(*id);
            with_board(&config, "", move |controller, session| {
                controller.load(session)?;
                controller.delete(session, &id)
            })
        }
        ["caption", path] => {
            let caption = describe(&config, &encode_image(Path::new(path))?);
            println!("{}\n{}", caption.title, caption.description);
            Ok(())
        }
        _ => Err(Error::InvalidInput(USAGE)),
    }
}

fn list(config: &Config, term: &str) -> Result<(), Error> {
    with_board(config, term, |controller, session| {
        controller.load(session).map(|_| ())
    })
}

fn add(
    config: &Config,
    path: &Path,
    title: Option<&&str>,
    caption: Option<&&str>,
) -> Result<(), Error> {
    let image_base64 = encode_image(path)?;
    let (title, caption) = match (title, caption) {
        (Some(title), Some(caption)) => (title.to_string(), caption.to_string()),
        (title, _) => {
            let generated = describe(config, &image_base64);
            (
                title.map_or(generated.title, |title| title.to_string()),
                generated.description,
            )
        }
    };
    let draft = Draft {
        image_base64,
        title,
        caption,
    };
    with_board(config, "", move |controller, session| {
        let id = controller.create(session, draft)?;
        log::info!("saved as {}", id);
        Ok(())
    })
}

/// Run `op` on a worker thread and print board events as they arrive, so a
/// cached board shows up before the network answers.
fn with_board<F>(config: &Config, term: &str, op: F) -> Result<(), Error>
where
    F: FnOnce(&mut SyncController<SheetStore>, &Session) -> Result<(), Error> + Send + 'static,
{
    let store = config.local_store()?;
    let session = Session::restore(store.clone());
    session.ensure_authenticated()?;

    let mut controller = SyncController::new(config.remote_store()?, SnapshotCache::new(store));
    let events = controller.receiver();
    let worker = thread::spawn(move || op(&mut controller, &session));

    let mut alerted = false;
    for event in events {
        match event {
            BoardEvent::Render(view) => render(&view, term),
            BoardEvent::Alert(alert) => {
                alerted = true;
                eprintln!("{}", alert.message());
            }
        }
    }

    let result = worker
        .join()
        .unwrap_or_else(|_| Err(io::Error::other("board worker panicked").into()));
    if already_reported(&result, alerted) {
        if let Err(err) = &result {
            log::debug!("{}", err);
        }
        process::exit(1);
    }
    result
}

/// A failed operation that raised an alert was already shown to the user.
fn already_reported(result: &Result<(), Error>, alerted: bool) -> bool {
    alerted && result.is_err()
}

fn render(view: &BoardView, term: &str) {
    let heading = match view.phase {
        LoadPhase::Idle => return,
        LoadPhase::Loading => {
            println!("Memuat kenangan...");
            return;
        }
        LoadPhase::Empty => {
            println!("Belum ada kenangan.");
            return;
        }
        LoadPhase::StaleDisplayed => "Kenangan (tersimpan)",
        LoadPhase::Fresh => "Kenangan",
    };
    let found = search::filter(&view.records, term);
    println!("{} ({}):", heading, found.len());
    for record in found {
        print_record(record);
    }
}

fn print_record(record: &Record) {
    let date = search::record_long_date(record).unwrap_or_else(|| record.created_at.clone());
    println!("  [{}] {} | {}", record.id, date, record.title);
    if !record.caption.is_empty() {
        println!("      {}", record.caption);
    }
}

fn encode_image(path: &Path) -> Result<String, Error> {
    let bytes = fs::read(path)?;
    Ok(STANDARD.encode(bytes))
}

fn describe(config: &Config, image_base64: &str) -> Caption {
    match config.caption_client() {
        Some(client) => caption_or_fallback(&client, image_base64),
        None => {
            log::info!("no caption service configured");
            Caption::fallback()
        }
    }
}
