//! tickcpu - CLI Entry Point
//!
//! Commands:
//! - `tickcpu run <program>` - Run an ASM source or memory image until it halts
//! - `tickcpu asm <source>` - Assemble to a memory image
//! - `tickcpu disasm <image>` - Disassemble a memory image
//! - `tickcpu demo` - Scroll "Hello World!" across the video buffer

use clap::{Parser, Subcommand};

use tickcpu::asm::demo::HELLO_WORLD;
use tickcpu::{assemble, Cpu, EmulatorConfig};

#[derive(Parser)]
#[command(name = "tickcpu")]
#[command(version)]
#[command(about = "A cycle-accurate emulator of a small 32-bit big-endian register machine")]
struct Cli {
    /// Log every memory and register write (same as RUST_LOG=debug)
    #[arg(long, global = true)]
    trace: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a program until it halts
    Run {
        /// Path to the ASM source (.asm) or memory image to execute
        program: String,
        /// JSON configuration file
        #[arg(short, long)]
        config: Option<String>,
        /// Address space in bytes, including the 4096-byte video buffer
        #[arg(long)]
        capacity: Option<u32>,
        /// Give up if the program has not halted after this many ticks
        #[arg(short, long)]
        max_ticks: Option<u64>,
    },
    /// Assemble source to a memory image
    Asm {
        /// Path to the source file
        source: String,
        /// Output image file
        #[arg(short, long)]
        output: Option<String>,
    },
    /// Disassemble a memory image to readable text
    Disasm {
        /// Path to the image file
        image: String,
    },
    /// Run the built-in video demo
    Demo,
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.trace);

    match cli.command {
        Commands::Run {
            program,
            config,
            capacity,
            max_ticks,
        } => {
            let mut config = load_config(config.as_deref());
            if let Some(capacity) = capacity {
                config.capacity = capacity;
            }
            if max_ticks.is_some() {
                config.max_ticks = max_ticks;
            }
            if let Err(e) = config.validate() {
                fail("Invalid configuration", e);
            }
            run_program(&program, &config);
        }
        Commands::Asm { source, output } => assemble_file(&source, output),
        Commands::Disasm { image } => disassemble_file(&image),
        Commands::Demo => run_demo(),
    }
}

fn init_logging(trace: bool) {
    let mut builder =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn"));
    if trace {
        builder.filter_level(log::LevelFilter::Debug);
    }
    builder.init();
}

fn fail(context: &str, err: impl std::fmt::Display) -> ! {
    eprintln!("❌ {}: {}", context, err);
    std::process::exit(1);
}

fn load_config(path: Option<&str>) -> EmulatorConfig {
    match path {
        Some(path) => EmulatorConfig::from_file(path).unwrap_or_else(|e| fail("Failed to load config", e)),
        None => EmulatorConfig::default(),
    }
}

fn load_program(path: &str) -> Vec<u32> {
    if path.ends_with(".asm") {
        let source =
            std::fs::read_to_string(path).unwrap_or_else(|e| fail("Failed to read file", e));
        let image = assemble(&source).unwrap_or_else(|e| fail("Assembly error", e));
        println!("📝 Assembled {} words", image.len());
        image
    } else {
        let image = tickcpu::asm::load_image(path).unwrap_or_else(|e| fail("Failed to load image", e));
        println!("📂 Loaded {} words", image.len());
        image.words
    }
}

fn run_program(path: &str, config: &EmulatorConfig) {
    println!("🔧 Running: {}", path);
    let image = load_program(path);

    let mut cpu =
        Cpu::from_config(&image, config).unwrap_or_else(|e| fail("Failed to build CPU", e));

    let result = cpu.run(config.max_ticks);

    println!();
    println!("━━━ Result ━━━");
    println!("Ticks:  {}", cpu.ticks());
    println!("PC:     {:#06x}", cpu.pc());
    println!("Frames: {}", cpu.frames_flushed());
    for index in 1..32u8 {
        match cpu.register(index) {
            Ok(0) => {}
            Ok(value) => println!("r{:<2}     {} ({:#010x})", index, value, value),
            Err(e) => fail("Register read failed", e),
        }
    }

    if let Err(e) = result {
        fail(&format!("CPU stopped at PC={:#06x}", cpu.pc()), e);
    }
}

fn assemble_file(source_path: &str, output: Option<String>) {
    use tickcpu::asm::{save_image, MemoryImage};

    let out_path = output.unwrap_or_else(|| source_path.replace(".asm", ".img"));
    println!("📝 Assembling: {} → {}", source_path, out_path);

    let source =
        std::fs::read_to_string(source_path).unwrap_or_else(|e| fail("Failed to read file", e));
    let words = assemble(&source).unwrap_or_else(|e| fail("Assembly error", e));
    println!("✓ Assembled {} words", words.len());

    if let Err(e) = save_image(&out_path, &MemoryImage::new(words)) {
        fail("Failed to save image", e);
    }
    println!("✓ Saved to {}", out_path);
}

fn disassemble_file(image_path: &str) {
    use tickcpu::asm::load_image;

    let image = load_image(image_path).unwrap_or_else(|e| fail("Failed to load image", e));
    println!("{}", tickcpu::disassemble(&image.words));
}

fn run_demo() {
    let image = assemble(HELLO_WORLD).unwrap_or_else(|e| fail("Assembly error", e));
    let mut cpu = Cpu::from_config(&image, &EmulatorConfig::default())
        .unwrap_or_else(|e| fail("Failed to build CPU", e));
    match cpu.run(None) {
        Ok(ticks) => println!("✓ Halted after {} ticks, {} frames", ticks, cpu.frames_flushed()),
        Err(e) => fail("CPU error", e),
    }
}
