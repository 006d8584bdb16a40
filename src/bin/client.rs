use anyhow::{Context, Result};
use clap::Parser;
use rodio::{Decoder, OutputStream, OutputStreamHandle, Sink, Source};
use song_catalog::client::api::DEFAULT_SERVER;
use song_catalog::client::player::format_time;
use song_catalog::client::{
    CatalogClient, CatalogView, PlaybackState, Player, PlayerEffect, PlayerEvent, Rendered,
};
use song_catalog::song::Song;
use std::collections::VecDeque;
use std::io::Cursor;
use std::path::PathBuf;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};

#[derive(Parser)]
#[command(name = "catalog-client")]
#[command(about = "Song Catalog CLI Client", long_about = None)]
struct Cli {
    /// Server URL
    #[arg(short, long, env = "SONG_CATALOG_SERVER", default_value = DEFAULT_SERVER)]
    server: String,

    /// Command to execute
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Parser)]
enum Command {
    /// Check server and catalog health
    Health,
    /// List all songs
    List,
    /// Show song details
    Info { id: u64 },
    /// Filter songs by title or artist
    Search { query: String },
    /// Upload a new song
    Upload {
        #[arg(short, long)]
        title: String,
        #[arg(short, long)]
        artist: String,
        /// Cover image file
        #[arg(long)]
        cover: PathBuf,
        /// Audio file
        #[arg(long)]
        song: PathBuf,
    },
    /// Play a song by ID, continuing through the catalog
    Play { id: u64 },
    /// Play the whole catalog from the first song
    PlayAll,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let client = CatalogClient::new(cli.server);

    match cli.command.unwrap_or(Command::List) {
        Command::Health => show_health(&client).await?,
        Command::List => {
            let view = load_view(&client).await?;
            print_rendered(&view.render());
        }
        Command::Info { id } => show_song_info(&client, id).await?,
        Command::Search { query } => {
            let mut view = load_view(&client).await?;
            view.set_query(&query);
            print_rendered(&view.render());
        }
        Command::Upload {
            title,
            artist,
            cover,
            song,
        } => upload_song(&client, &title, &artist, &cover, &song).await?,
        Command::Play { id } => {
            let view = load_view(&client).await?;
            let index = view
                .songs()
                .iter()
                .position(|s| s.id == id)
                .with_context(|| format!("Song {} not found", id))?;
            play(&client, view, index).await?
        }
        Command::PlayAll => {
            let view = load_view(&client).await?;
            if view.songs().is_empty() {
                println!("No songs in the catalog.");
                return Ok(());
            }
            play(&client, view, 0).await?
        }
    }

    Ok(())
}

/// Run the health gate and fetch the catalog, as the catalog screen does on load.
async fn load_view(client: &CatalogClient) -> Result<CatalogView> {
    let mut view = CatalogView::new(client.base_url());
    view.start();

    let health = client.health().await.map_err(|e| format!("{:#}", e));
    if !view.health_checked(health) {
        anyhow::bail!("{}", view.error().unwrap_or("Server is not available"));
    }

    let songs = client.list_songs().await.map_err(|e| format!("{:#}", e));
    view.catalog_loaded(songs);
    if let Some(error) = view.error() {
        anyhow::bail!("Failed to load songs: {}", error);
    }

    Ok(view)
}

async fn show_health(client: &CatalogClient) -> Result<()> {
    let report = client.health().await?;

    println!("Server Status: {}", report.status);
    println!("{:-<80}", "");
    println!("Message:  {}", report.message);
    println!("Database: {}", report.database);
    println!("Checked:  {}", report.timestamp);

    if !report.is_ok() {
        anyhow::bail!("Catalog is not available");
    }
    Ok(())
}

fn print_rendered(rendered: &Rendered) {
    match rendered {
        Rendered::Cards(cards) => {
            println!("Song Catalog ({} songs):", cards.len());
            println!("{:-<80}", "");
            for card in cards {
                let marker = if card.active { "▶" } else { " " };
                println!("{} {}. {} - {}", marker, card.id, card.artist, card.title);
                println!("   Cover: {}", card.cover_url);
            }
        }
        Rendered::Placeholder(message) => println!("{}", message),
        Rendered::Unavailable(message) => println!("Server not available: {}", message),
    }
}

async fn show_song_info(client: &CatalogClient, id: u64) -> Result<()> {
    let song = client
        .get_song(id)
        .await?
        .with_context(|| format!("Song {} not found", id))?;

    print_song(client, &song);
    Ok(())
}

fn print_song(client: &CatalogClient, song: &Song) {
    println!("Song Information:");
    println!("{:-<80}", "");
    println!("Title:   {}", song.title);
    println!("Artist:  {}", song.artist);
    println!("ID:      {}", song.id);
    println!("Cover:   {}", client.asset_url(&song.cover_path));
    println!("Audio:   {}", client.asset_url(&song.song_path));
    println!("Created: {}", song.created_at);
}

async fn upload_song(
    client: &CatalogClient,
    title: &str,
    artist: &str,
    cover: &std::path::Path,
    song: &std::path::Path,
) -> Result<()> {
    let mut view = load_view(client).await?;
    view.open_upload();

    match client.create_song(title, artist, cover, song).await {
        Ok(created) => {
            println!("✓ Song uploaded successfully!");
            print_song(client, &created);
            view.upload_succeeded(created);
            Ok(())
        }
        Err(e) => {
            view.upload_failed(format!("Upload failed: {:#}", e));
            let message = view.upload_dialog().error.clone().unwrap_or_default();
            anyhow::bail!("{}", message)
        }
    }
}

/// Local audio output the player's effects are carried out on
struct Deck {
    _stream: OutputStream,
    handle: OutputStreamHandle,
    sink: Sink,
}

impl Deck {
    fn new() -> Result<Self> {
        let (stream, handle) =
            OutputStream::try_default().context("Failed to initialize audio output")?;
        let sink = Sink::try_new(&handle).context("Failed to create audio sink")?;
        Ok(Self {
            _stream: stream,
            handle,
            sink,
        })
    }

    /// Replace the current track, paused; returns its duration when known.
    fn load(&mut self, data: Vec<u8>) -> Result<Option<Duration>> {
        let source = Decoder::new(Cursor::new(data)).context("Failed to decode audio")?;
        let duration = source.total_duration();

        let sink = Sink::try_new(&self.handle).context("Failed to create audio sink")?;
        sink.pause();
        sink.append(source);
        self.sink = sink;

        Ok(duration)
    }

    fn play(&self) {
        self.sink.play();
    }

    fn pause(&self) {
        self.sink.pause();
    }

    /// Silence the current track; `load` installs a fresh sink afterwards.
    fn stop(&self) {
        self.sink.stop();
    }

    fn seek(&self, position: Duration) -> Result<()> {
        self.sink
            .try_seek(position)
            .map_err(|e| anyhow::anyhow!("Seek failed: {:?}", e))
    }

    fn position(&self) -> Duration {
        self.sink.get_pos()
    }

    fn finished(&self) -> bool {
        self.sink.empty()
    }
}

enum Control {
    Event(PlayerEvent),
    Seek(Duration),
    Quit,
}

fn parse_control(line: &str) -> Option<Control> {
    let mut parts = line.split_whitespace();
    match parts.next()? {
        "p" => Some(Control::Event(PlayerEvent::TogglePlay)),
        "n" => Some(Control::Event(PlayerEvent::Next)),
        "s" => {
            let secs: f64 = parts.next()?.parse().ok()?;
            if secs < 0.0 || !secs.is_finite() {
                return None;
            }
            Some(Control::Seek(Duration::from_secs_f64(secs)))
        }
        "q" => Some(Control::Quit),
        _ => None,
    }
}

/// Drive the player from stdin commands and sink polling until the catalog
/// runs out or the user quits.
async fn play(client: &CatalogClient, mut view: CatalogView, start: usize) -> Result<()> {
    let mut deck = Deck::new()?;
    let mut player = Player::new(view.songs().to_vec());
    let mut pending = VecDeque::from([PlayerEvent::Select(start)]);
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut ticker = tokio::time::interval(Duration::from_millis(250));

    println!("Controls: p = play/pause, n = next, s <secs> = seek, q = quit");

    loop {
        while let Some(event) = pending.pop_front() {
            for effect in player.handle(event) {
                let outcome = execute(client, &mut deck, &mut view, effect).await;
                pending.extend(outcome.events);
                if outcome.skip_rest {
                    break;
                }
            }
        }

        if player.state() == PlaybackState::Ended {
            println!("\n✓ Reached the end of the catalog");
            break;
        }

        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line.context("Failed to read stdin")? else {
                    break;
                };
                match parse_control(&line) {
                    Some(Control::Quit) => break,
                    Some(Control::Event(event)) => pending.push_back(event),
                    Some(Control::Seek(position)) => pending.extend([
                        PlayerEvent::SeekStart,
                        PlayerEvent::SeekTo(position),
                        PlayerEvent::SeekEnd,
                    ]),
                    None => println!("Unknown command: {}", line.trim()),
                }
            }
            _ = ticker.tick() => {
                if player.state() == PlaybackState::Playing {
                    if deck.finished() {
                        pending.push_back(PlayerEvent::Ended);
                    } else {
                        pending.push_back(PlayerEvent::TimeUpdate(deck.position()));
                    }
                }
            }
        }
    }

    Ok(())
}

/// Backend notifications produced by one effect
struct Outcome {
    events: Vec<PlayerEvent>,
    /// Drop the effects queued after this one, e.g. `Play` after a failed load
    skip_rest: bool,
}

impl From<Vec<PlayerEvent>> for Outcome {
    fn from(events: Vec<PlayerEvent>) -> Self {
        Self {
            events,
            skip_rest: false,
        }
    }
}

/// Carry out one effect, returning the backend notifications it produced.
async fn execute(
    client: &CatalogClient,
    deck: &mut Deck,
    view: &mut CatalogView,
    effect: PlayerEffect,
) -> Outcome {
    match effect {
        PlayerEffect::Load { index, song_path } => {
            deck.stop();
            if let Some(song) = view.activate(index) {
                println!("Now Playing: {} - {}", song.artist, song.title);
            }

            let loaded = match client.fetch_asset(&song_path).await {
                Ok(data) => deck.load(data),
                Err(e) => Err(e),
            };
            match loaded {
                Ok(Some(duration)) => {
                    println!("  Duration: {}", format_time(duration));
                    vec![PlayerEvent::MetadataLoaded(duration)].into()
                }
                Ok(None) => Vec::new().into(),
                Err(e) => {
                    println!("  ⚠️  {:#}, skipping", e);
                    Outcome {
                        events: vec![PlayerEvent::Ended],
                        skip_rest: true,
                    }
                }
            }
        }
        PlayerEffect::Play => {
            deck.play();
            println!("  ▶️  Playing");
            vec![PlayerEvent::Started].into()
        }
        PlayerEffect::Pause => {
            deck.pause();
            println!("  ⏸  Paused at {}", format_time(deck.position()));
            vec![PlayerEvent::Paused].into()
        }
        PlayerEffect::Seek(position) => {
            match deck.seek(position) {
                Ok(()) => println!("  ⏩ {}", format_time(position)),
                Err(e) => println!("  ⚠️  {:#}", e),
            }
            Vec::new().into()
        }
    }
}
