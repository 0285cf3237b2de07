//! Stego Lab - image and text steganography toolkit.
//!
//! Embeds and extracts payloads and runs steganalysis over images.

use anyhow::{bail, Context};
use clap::{Parser, Subcommand, ValueEnum};
use stego_lab::analysis::{analyze_batch, collect_images, detectors, AnalysisReport, Method};
use stego_lab::bits::bits_to_bytes;
use stego_lab::config::DEFAULT_KEY;
use stego_lab::crypto::KeyDerivation;
use stego_lab::embed::{embed_with_report, Interpolation, LsbMatchingRevisited, PatternFlags};
use stego_lab::encoding::LinearHash;
use stego_lab::imaging::{bit_plane, load, load_gray, save_gray};
use stego_lab::{text, Embedder, LabConfig, Scheme};
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info, Level};
use tracing_subscriber::FmtSubscriber;

#[derive(Parser)]
#[command(name = "stego-lab")]
#[command(author, version, about, long_about = None)]
#[command(
    about = "Image and text steganography with steganalysis",
    long_about = "Hide payloads in images (LSB matching revisited, pixel interpolation, pattern flags) or in text whitespace, and detect LSB embedding with chi-square, RS and AUMP."
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// JSON configuration file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Render one bit plane of an image
    Bitplane {
        /// Input image
        image: PathBuf,

        /// Bit index, 0 (LSB) to 7 (MSB)
        #[arg(long, default_value = "0")]
        bit: u8,

        /// Output image
        #[arg(long)]
        output: PathBuf,
    },

    /// Embed a payload into a cover image
    Embed {
        /// Embedding scheme
        #[arg(value_enum)]
        scheme: SchemeArg,

        /// Cover image
        cover: PathBuf,

        /// Output stego image (use a lossless format)
        #[arg(long)]
        output: PathBuf,

        /// Message text
        #[arg(long, conflicts_with = "input")]
        message: Option<String>,

        /// File to embed
        #[arg(long, conflicts_with = "message")]
        input: Option<PathBuf>,

        #[command(flatten)]
        key: KeyArgs,

        /// Hash blocks for the interpolation scheme: `parity` or `mixing[:M]`
        #[arg(long)]
        hash: Option<String>,

        /// Seed for reproducible LSB matching
        #[arg(long)]
        seed: Option<u64>,
    },

    /// Extract a payload from a stego image
    Extract {
        /// Embedding scheme
        #[arg(value_enum)]
        scheme: SchemeArg,

        /// Stego image
        stego: PathBuf,

        /// Output file (default: stdout)
        #[arg(long)]
        output: Option<PathBuf>,

        #[command(flatten)]
        key: KeyArgs,

        /// Hash blocks used when embedding
        #[arg(long)]
        hash: Option<String>,

        /// Print the payload as hex
        #[arg(long)]
        hex: bool,
    },

    /// Show the payload capacity of a cover for every scheme
    Capacity {
        /// Cover image
        cover: PathBuf,

        /// Message used to measure the pattern-flag capacity
        #[arg(long)]
        message: Option<String>,
    },

    /// Run steganalysis on images or directories
    Analyze {
        /// Images or directories
        #[arg(required = true)]
        paths: Vec<PathBuf>,

        /// Detection method
        #[arg(long, value_enum, default_value = "all")]
        method: MethodArg,

        /// Write all results as JSON
        #[arg(long)]
        report: Option<PathBuf>,
    },

    /// Hide a message in the word gaps of a text file
    TextEmbed {
        /// Cover text file
        cover: PathBuf,

        /// Message text
        #[arg(long, conflicts_with = "input")]
        message: Option<String>,

        /// File to embed
        #[arg(long, conflicts_with = "message")]
        input: Option<PathBuf>,

        /// Output text file
        #[arg(long)]
        output: PathBuf,
    },

    /// Recover a message from a text file
    TextExtract {
        /// Stego text file
        file: PathBuf,

        /// Output file (default: stdout)
        #[arg(long)]
        output: Option<PathBuf>,
    },

    /// Print the default configuration as JSON
    Config,
}

#[derive(clap::Args)]
struct KeyArgs {
    /// Whitening key for the interpolation scheme
    #[arg(long, conflicts_with = "prompt_key")]
    key: Option<String>,

    /// Read the key from a hidden prompt
    #[arg(long)]
    prompt_key: bool,
}

#[derive(Clone, Copy, ValueEnum)]
enum SchemeArg {
    Lsbmr,
    Interpolation,
    Patterns,
}

impl From<SchemeArg> for Scheme {
    fn from(arg: SchemeArg) -> Self {
        match arg {
            SchemeArg::Lsbmr => Scheme::Lsbmr,
            SchemeArg::Interpolation => Scheme::Interpolation,
            SchemeArg::Patterns => Scheme::Patterns,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum MethodArg {
    Chi2,
    Rs,
    Aump,
    All,
}

impl MethodArg {
    fn methods(self) -> Vec<Method> {
        match self {
            MethodArg::Chi2 => vec![Method::ChiSquare],
            MethodArg::Rs => vec![Method::Rs],
            MethodArg::Aump => vec![Method::Aump],
            MethodArg::All => Method::ALL.to_vec(),
        }
    }
}

fn main() {
    let cli = Cli::parse();
    setup_logging(cli.verbose);

    if let Err(e) = run(cli) {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

fn setup_logging(verbose: bool) {
    let level = if verbose { Level::DEBUG } else { Level::INFO };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_writer(io::stderr)
        .compact()
        .finish();
    if tracing::subscriber::set_global_default(subscriber).is_err() {
        eprintln!("Logging already initialised");
    }
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let config = match &cli.config {
        Some(path) => LabConfig::from_file(path)
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => LabConfig::default(),
    };

    match cli.command {
        Commands::Bitplane { image, bit, output } => cmd_bitplane(&image, bit, &output),

        Commands::Embed {
            scheme,
            cover,
            output,
            message,
            input,
            key,
            hash,
            seed,
        } => {
            let payload = read_payload(message, input)?;
            let embedder = build_embedder(scheme.into(), &config, &key, hash.as_deref(), seed)?;
            cmd_embed(embedder.as_ref(), &cover, &output, &payload)
        }

        Commands::Extract {
            scheme,
            stego,
            output,
            key,
            hash,
            hex,
        } => {
            let embedder = build_embedder(scheme.into(), &config, &key, hash.as_deref(), None)?;
            cmd_extract(embedder.as_ref(), &stego, output, hex, hash.is_some())
        }

        Commands::Capacity { cover, message } => cmd_capacity(&cover, message.as_deref()),

        Commands::Analyze {
            paths,
            method,
            report,
        } => cmd_analyze(&config, &paths, method, report),

        Commands::TextEmbed {
            cover,
            message,
            input,
            output,
        } => {
            let payload = read_payload(message, input)?;
            cmd_text_embed(&cover, &payload, &output)
        }

        Commands::TextExtract { file, output } => cmd_text_extract(&file, output),

        Commands::Config => {
            println!("{}", serde_json::to_string_pretty(&LabConfig::default())?);
            Ok(())
        }
    }
}

fn resolve_key(args: &KeyArgs) -> anyhow::Result<String> {
    if args.prompt_key {
        return rpassword::prompt_password("Key: ").context("Failed to read key");
    }
    Ok(args.key.clone().unwrap_or_else(|| DEFAULT_KEY.to_string()))
}

fn parse_hash(name: &str, config: &LabConfig, key: &str) -> anyhow::Result<LinearHash> {
    let n = config.hash.block_size;
    let hash = match name.split_once(':') {
        None if name == "parity" => LinearHash::parity(n)?,
        None if name == "mixing" => LinearHash::keyed(n, config.hash.hash_bits, key)?,
        Some(("mixing", m)) => {
            let m: usize = m
                .parse()
                .with_context(|| format!("Invalid hash bit count '{}'", m))?;
            LinearHash::keyed(n, m, key)?
        }
        _ => bail!("Unknown hash '{}', expected parity or mixing[:M]", name),
    };
    Ok(hash)
}

fn build_embedder(
    scheme: Scheme,
    config: &LabConfig,
    key: &KeyArgs,
    hash: Option<&str>,
    seed: Option<u64>,
) -> anyhow::Result<Box<dyn Embedder>> {
    if hash.is_some() && scheme != Scheme::Interpolation {
        bail!("--hash is only supported by the interpolation scheme");
    }

    let embedder: Box<dyn Embedder> = match scheme {
        Scheme::Lsbmr => Box::new(match seed {
            Some(seed) => LsbMatchingRevisited::with_seed(seed),
            None => LsbMatchingRevisited::new(),
        }),
        Scheme::Interpolation => {
            let key = resolve_key(key)?;
            debug!(fingerprint = %KeyDerivation::from_key(&key).fingerprint(), "Whitening key");
            let scheme = Interpolation::new(&key);
            Box::new(match hash {
                Some(name) => scheme.with_hash(parse_hash(name, config, &key)?),
                None => scheme,
            })
        }
        Scheme::Patterns => Box::new(PatternFlags::new()),
    };
    Ok(embedder)
}

fn read_payload(message: Option<String>, input: Option<PathBuf>) -> anyhow::Result<Vec<u8>> {
    let payload = match (message, input) {
        (Some(s), None) => s.into_bytes(),
        (None, Some(path)) => std::fs::read(&path)
            .with_context(|| format!("Failed to read {}", path.display()))?,
        (None, None) => {
            let mut buffer = Vec::new();
            io::stdin().read_to_end(&mut buffer)?;
            buffer
        }
        (Some(_), Some(_)) => bail!("--message and --input are mutually exclusive"),
    };
    Ok(payload)
}

fn write_output(output: Option<PathBuf>, data: &[u8]) -> anyhow::Result<()> {
    match output {
        Some(path) => {
            std::fs::write(&path, data)
                .with_context(|| format!("Failed to write {}", path.display()))?;
            println!("Wrote {} bytes to {}", data.len(), path.display());
        }
        None => {
            io::stdout().write_all(data)?;
        }
    }
    Ok(())
}

fn cmd_bitplane(image: &Path, bit: u8, output: &Path) -> anyhow::Result<()> {
    let img = load(image).with_context(|| format!("Failed to open {}", image.display()))?;
    let plane = bit_plane(&img, bit)?;
    save_gray(output, &plane)?;
    println!("Bit plane {} written to {}", bit, output.display());
    Ok(())
}

fn cmd_embed(
    embedder: &dyn Embedder,
    cover: &Path,
    output: &Path,
    payload: &[u8],
) -> anyhow::Result<()> {
    let cover_img =
        load_gray(cover).with_context(|| format!("Failed to open {}", cover.display()))?;
    let (stego, report) = embed_with_report(embedder, &cover_img, payload)?;
    save_gray(output, &stego)?;

    println!("Embedding Report");
    println!("================");
    println!("Scheme:       {}", report.scheme);
    println!("Payload:      {} bits", report.payload_bits);
    println!("Capacity:     {} bits", report.capacity_bits);
    println!("Utilisation:  {:.2}%", report.utilisation);
    println!("PSNR:         {:.2} dB", report.psnr);
    println!("Output:       {}", output.display());
    Ok(())
}

fn cmd_extract(
    embedder: &dyn Embedder,
    stego: &Path,
    output: Option<PathBuf>,
    as_hex: bool,
    hashed: bool,
) -> anyhow::Result<()> {
    let img = load_gray(stego).with_context(|| format!("Failed to open {}", stego.display()))?;
    let report = embedder.extract_checked(&img)?;
    let data = bits_to_bytes(&report.data);
    info!(
        scheme = embedder.name(),
        bytes = data.len(),
        blocks = report.total_blocks,
        corrupted = report.corrupted_blocks,
        "Payload extracted"
    );

    // stdout may carry the payload.
    if hashed {
        eprintln!(
            "Extracted blocks: {}, Errors: {}, Valid: {}",
            report.total_blocks,
            report.corrupted_blocks,
            report.valid_blocks()
        );
    }

    if as_hex {
        let encoded = hex::encode(&data);
        write_output(output, encoded.as_bytes())?;
        if !encoded.is_empty() {
            println!();
        }
        Ok(())
    } else {
        write_output(output, &data)
    }
}

fn cmd_capacity(cover: &Path, message: Option<&str>) -> anyhow::Result<()> {
    let img = load_gray(cover).with_context(|| format!("Failed to open {}", cover.display()))?;

    println!("Capacity of {} ({}x{})", cover.display(), img.width(), img.height());
    println!("==========================================");
    for scheme in Scheme::ALL {
        let (name, bits) = match scheme {
            Scheme::Lsbmr => ("lsbmr", LsbMatchingRevisited::new().capacity_bits(&img)),
            Scheme::Interpolation => ("interpolation", Interpolation::default().capacity_bits(&img)),
            Scheme::Patterns => ("patterns (upper bound)", PatternFlags::new().capacity_bits(&img)),
        };
        println!("  {:<24} {:>10} bits  {:>9} bytes", name, bits, bits / 8);
    }

    if let Some(message) = message {
        let bits = stego_lab::bits::bytes_to_bits(message.as_bytes());
        let fits = PatternFlags::new().capacity_for(&img, &bits);
        println!();
        println!(
            "Pattern flags fit {} of {} message bits (header not counted)",
            fits,
            bits.len()
        );
    }
    Ok(())
}

fn cmd_analyze(
    config: &LabConfig,
    paths: &[PathBuf],
    method: MethodArg,
    report: Option<PathBuf>,
) -> anyhow::Result<()> {
    let mut images = Vec::new();
    for path in paths {
        if path.is_dir() {
            images.extend(collect_images(path)?);
        } else {
            images.push(path.clone());
        }
    }
    if images.is_empty() {
        bail!("No images found");
    }

    let detectors = detectors(config, &method.methods());
    let entries = analyze_batch(&images, &detectors, config.workers)?;

    for entry in &entries {
        println!("{}", entry.path.display());
        if let Some(error) = &entry.error {
            println!("  error: {}", error);
            continue;
        }
        for report in &entry.reports {
            let verdict = report.verdict();
            let detail = match report {
                AnalysisReport::ChiSquare(r) => format!(
                    "mean p = {:.4} over {} blocks",
                    r.mean_p_value,
                    r.block_p_values.len()
                ),
                AnalysisReport::Rs(r) => format!(
                    "message length = {:.4} (~{:.0} bytes)",
                    r.message_length, r.estimated_bytes
                ),
                AnalysisReport::Aump(r) => format!("beta = {:.4}", r.beta),
            };
            println!(
                "  {:<10} {:<8} {}",
                report.method().to_string(),
                if verdict.contains_payload { "STEGO" } else { "clean" },
                detail
            );
        }
    }

    if let Some(path) = report {
        let json = serde_json::to_string_pretty(&entries)?;
        std::fs::write(&path, json)
            .with_context(|| format!("Failed to write {}", path.display()))?;
        println!();
        println!("Results saved to {}", path.display());
    }
    Ok(())
}

fn cmd_text_embed(cover: &Path, payload: &[u8], output: &Path) -> anyhow::Result<()> {
    let cover_text = std::fs::read_to_string(cover)
        .with_context(|| format!("Failed to read {}", cover.display()))?;
    let (stego, report) = text::embed(&cover_text, payload)?;
    std::fs::write(output, stego)
        .with_context(|| format!("Failed to write {}", output.display()))?;

    println!("Message embedded");
    println!("  Used {} of {} words", report.bits_used, report.words);
    println!("  Filled {:.2}% of the available space", report.utilisation);
    Ok(())
}

fn cmd_text_extract(file: &Path, output: Option<PathBuf>) -> anyhow::Result<()> {
    let stego = std::fs::read_to_string(file)
        .with_context(|| format!("Failed to read {}", file.display()))?;
    let message = text::extract(&stego);
    if message.is_empty() {
        bail!("No message found");
    }
    write_output(output, &message)
}
