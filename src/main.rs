use std::path::PathBuf;
use std::time::Duration;

use clap::{Args, Parser, Subcommand};
use rand::rngs::StdRng;
use rand::SeedableRng;

use vidprobe::codegen::workflow::prompt_line;
use vidprobe::{
    run_session, ActionPolicy, BackoffPolicy, ChromeDriver, ConnectionMode, RegenWorkflow,
    SamplePlan, ScriptGenerator, TelemetryCollection, TwitchConfig, TwitchDriver, WorkflowConfig,
    YoutubeConfig, YoutubeDriver,
};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Args, Debug, Clone)]
struct BrowserOpts {
    /// Run the browser headless
    #[arg(long)]
    headless: bool,

    /// Pass --no-sandbox to Chrome (Linux AppArmor workaround)
    #[arg(long)]
    no_sandbox: bool,

    /// Explicit Chrome executable path
    #[arg(long)]
    chrome_path: Option<String>,

    /// Connect to an already-running Chrome on this debug port instead of
    /// launching one
    #[arg(long)]
    debug_port: Option<u16>,
}

impl BrowserOpts {
    fn mode(&self) -> ConnectionMode {
        match self.debug_port {
            Some(port) => ConnectionMode::DebugPort(port),
            None => ConnectionMode::Sandboxed {
                chrome_path: self.chrome_path.clone(),
                no_sandbox: self.no_sandbox,
                headless: self.headless,
            },
        }
    }
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Sample video stats from random Twitch channels
    Twitch {
        #[command(flatten)]
        browser: BrowserOpts,

        /// Number of channels to process (prompted for when omitted)
        #[arg(short, long)]
        iterations: Option<usize>,

        /// Samples to take per channel
        #[arg(long, default_value_t = 10)]
        samples: u32,

        /// Seconds between samples
        #[arg(long, default_value_t = 1.0)]
        interval: f64,

        /// Output file, overwritten each run
        #[arg(long, default_value = "twitch_telemetry.json")]
        out: PathBuf,

        /// Override the random-channel page URL
        #[arg(long)]
        source_url: Option<String>,
    },

    /// Search YouTube for random words and sample "Stats for nerds"
    Youtube {
        #[command(flatten)]
        browser: BrowserOpts,

        /// Number of videos to process (prompted for when omitted)
        #[arg(short, long)]
        iterations: Option<usize>,

        /// Fixed watch time per video in seconds (default: randomized per
        /// video)
        #[arg(long)]
        watch: Option<f64>,

        /// Fixed sample count per video instead of a watch time
        #[arg(long, conflicts_with = "watch")]
        samples: Option<u32>,

        /// Seconds between samples
        #[arg(long, default_value_t = 1.0)]
        interval: f64,

        /// Output file, overwritten each run
        #[arg(long, default_value = "youtube_telemetry.json")]
        out: PathBuf,

        /// File with one search word per line (default: built-in list)
        #[arg(long)]
        wordlist: Option<PathBuf>,

        /// Per-tick probability of a fake user action
        #[arg(long, default_value_t = 0.3)]
        action_probability: f64,
    },

    /// Parse the stats blobs of a saved telemetry file into named fields
    Parse {
        /// Telemetry JSON produced by a probe run
        #[arg(short, long)]
        input: PathBuf,

        /// Output file (default: <input>_parsed.json)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Record, regenerate, and iterate on automation scripts
    Workflow {
        /// Claude CLI executable
        #[arg(long, default_value = "claude")]
        claude_path: String,

        /// Model override for the Claude CLI
        #[arg(long)]
        model: Option<String>,

        /// Recorder executable (invoked as `<recorder> codegen <url> -o <file>`)
        #[arg(long, default_value = "playwright")]
        recorder: String,

        /// Interpreter for the generated scripts
        #[arg(long, default_value = "python3")]
        runner: String,
    },
}

#[tokio::main]
async fn main() {
    env_logger::init();
    let cli = Cli::parse();

    let code = match cli.command {
        Commands::Twitch {
            browser,
            iterations,
            samples,
            interval,
            out,
            source_url,
        } => run_twitch(browser, iterations, samples, interval, out, source_url).await,
        Commands::Youtube {
            browser,
            iterations,
            watch,
            samples,
            interval,
            out,
            wordlist,
            action_probability,
        } => {
            run_youtube(
                browser,
                iterations,
                watch,
                samples,
                interval,
                out,
                wordlist,
                action_probability,
            )
            .await
        }
        Commands::Parse { input, output } => run_parse(input, output).await,
        Commands::Workflow {
            claude_path,
            model,
            recorder,
            runner,
        } => run_workflow(claude_path, model, recorder, runner).await,
    };

    if code != 0 {
        std::process::exit(code);
    }
}

async fn run_twitch(
    browser: BrowserOpts,
    iterations: Option<usize>,
    samples: u32,
    interval: f64,
    out: PathBuf,
    source_url: Option<String>,
) -> i32 {
    let iterations = match resolve_iterations(
        iterations,
        "How many random Twitch channels should I process? ",
    ) {
        Ok(n) => n,
        Err(e) => {
            eprintln!("{}", e);
            return 1;
        }
    };

    let interval = match positive_interval(interval) {
        Ok(d) => d,
        Err(e) => {
            eprintln!("{}", e);
            return 1;
        }
    };

    let mut config = TwitchConfig {
        plan: SamplePlan::count(samples).with_interval(interval),
        ..TwitchConfig::default()
    };
    if let Some(url) = source_url {
        config.source_url = url;
    }

    let chrome = match ChromeDriver::new(browser.mode()).await {
        Ok(chrome) => chrome,
        Err(e) => {
            log::error!("Failed to acquire browser: {}", e);
            eprintln!("Error: {}", e);
            return 1;
        }
    };

    log::info!(
        "Starting Twitch stats collection for {} channels",
        iterations
    );

    let collection = {
        let mut driver = TwitchDriver::new(&chrome, config);
        let mut rng = StdRng::from_entropy();
        run_session(&mut driver, iterations, &BackoffPolicy::default(), &mut rng).await
    };

    if let Err(e) = chrome.close().await {
        log::warn!("Browser close failed: {}", e);
    }

    finish_run(collection, &out).await
}

#[allow(clippy::too_many_arguments)]
async fn run_youtube(
    browser: BrowserOpts,
    iterations: Option<usize>,
    watch: Option<f64>,
    samples: Option<u32>,
    interval: f64,
    out: PathBuf,
    wordlist: Option<PathBuf>,
    action_probability: f64,
) -> i32 {
    let iterations =
        match resolve_iterations(iterations, "How many random videos should I process? ") {
            Ok(n) => n,
            Err(e) => {
                eprintln!("{}", e);
                return 1;
            }
        };

    let interval = match positive_interval(interval) {
        Ok(d) => d,
        Err(e) => {
            eprintln!("{}", e);
            return 1;
        }
    };

    let plan = match (watch, samples) {
        (Some(secs), _) if secs > 0.0 => {
            Some(SamplePlan::duration(Duration::from_secs_f64(secs)).with_interval(interval))
        }
        (Some(_), _) => {
            eprintln!("Please provide a positive watch time.");
            return 1;
        }
        (None, Some(n)) => Some(SamplePlan::count(n).with_interval(interval)),
        (None, None) => None,
    };

    let words = match wordlist {
        Some(path) => match vidprobe::wordlist::load_words(&path).await {
            Ok(words) => words,
            Err(e) => {
                eprintln!("Error loading word list: {}", e);
                return 1;
            }
        },
        None => vidprobe::wordlist::default_words(),
    };

    let config = YoutubeConfig {
        wordlist: words,
        plan,
        actions: ActionPolicy::new(action_probability),
        ..YoutubeConfig::default()
    };

    let chrome = match ChromeDriver::new(browser.mode()).await {
        Ok(chrome) => chrome,
        Err(e) => {
            log::error!("Failed to acquire browser: {}", e);
            eprintln!("Error: {}", e);
            return 1;
        }
    };

    log::info!("Starting YouTube stats collection for {} videos", iterations);

    let collection = {
        let mut driver = YoutubeDriver::new(&chrome, config);
        let mut rng = StdRng::from_entropy();
        run_session(&mut driver, iterations, &BackoffPolicy::default(), &mut rng).await
    };

    if let Err(e) = chrome.close().await {
        log::warn!("Browser close failed: {}", e);
    }

    finish_run(collection, &out).await
}

async fn run_parse(input: PathBuf, output: Option<PathBuf>) -> i32 {
    let output = output.unwrap_or_else(|| {
        let stem = input
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("telemetry");
        input.with_file_name(format!("{}_parsed.json", stem))
    });

    match vidprobe::parse_telemetry_file(&input, &output).await {
        Ok(count) => {
            println!(
                "Parsed {} records from {} into {}",
                count,
                input.display(),
                output.display()
            );
            0
        }
        Err(e) => {
            log::error!("Parse failed: {:#}", e);
            eprintln!("Error: {:#}", e);
            1
        }
    }
}

async fn run_workflow(
    claude_path: String,
    model: Option<String>,
    recorder: String,
    runner: String,
) -> i32 {
    let mut generator = ScriptGenerator::new().with_claude_path(claude_path);
    if let Some(model) = model {
        generator = generator.with_model(model);
    }

    let config = WorkflowConfig {
        recorder_cmd: recorder,
        runner_cmd: runner,
        ..WorkflowConfig::default()
    };

    match RegenWorkflow::new(generator, config).run().await {
        Ok(()) => 0,
        Err(e) => {
            eprintln!("Workflow error: {:#}", e);
            1
        }
    }
}

/// Save the run's records, falling back to a console dump so a write failure
/// never loses the collected data.
async fn finish_run(collection: TelemetryCollection, out: &PathBuf) -> i32 {
    println!("Collected telemetry for {} subjects.", collection.len());

    match collection.save(out).await {
        Ok(()) => {
            println!("Telemetry saved to {}", out.display());
            0
        }
        Err(e) => {
            log::error!("Failed to write {}: {:#}", out.display(), e);
            eprintln!("Error saving telemetry to file: {:#}", e);
            collection.dump_to_console();
            1
        }
    }
}

fn resolve_iterations(arg: Option<usize>, question: &str) -> anyhow::Result<usize> {
    let n = match arg {
        Some(n) => n,
        None => {
            let line = prompt_line(question)?;
            line.parse::<usize>().map_err(|_| {
                anyhow::anyhow!("Invalid input. Please enter a numerical value.")
            })?
        }
    };
    anyhow::ensure!(n > 0, "Please enter a positive number of subjects.");
    Ok(n)
}

fn positive_interval(secs: f64) -> anyhow::Result<Duration> {
    anyhow::ensure!(
        secs.is_finite() && secs > 0.0,
        "Please provide a positive sampling interval."
    );
    Ok(Duration::from_secs_f64(secs))
}
