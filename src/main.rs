use log::{debug, info};
use pvm::config::VmConfig;
use pvm::dictionary::Dictionary;
use pvm::disassembler::Disassembler;
use pvm::image::Image;
use pvm::interpreter::{Interpreter, Outcome};
use pvm::trace::TraceObserver;
use pvm::vm::VM;
use pvm::VmError;
use std::env;
use std::fs;
use std::path::PathBuf;
use std::process;

struct Options {
    source: Option<PathBuf>,
    image: Option<PathBuf>,
    config: Option<PathBuf>,
    trace: bool,
    limit: Option<u64>,
    list: bool,
    words: bool,
}

fn print_usage(program: &str) {
    println!("pvm - persistent stack machine");
    println!();
    println!(
        "Usage: {} [--image PATH] [--config FILE] [--trace] [--limit N] [--list] [--words] [SOURCE]",
        program
    );
    println!();
    println!("SOURCE is assembled only when the image does not exist yet;");
    println!("an existing image resumes from its saved state.");
}

fn parse_args(args: &[String]) -> Result<Options, String> {
    let mut options = Options {
        source: None,
        image: None,
        config: None,
        trace: false,
        limit: None,
        list: false,
        words: false,
    };

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--image" | "--config" | "--limit" => {
                let value = args
                    .get(i + 1)
                    .ok_or_else(|| format!("{} requires a value", args[i]))?;
                match args[i].as_str() {
                    "--image" => options.image = Some(PathBuf::from(value)),
                    "--config" => options.config = Some(PathBuf::from(value)),
                    _ => {
                        let limit = value
                            .parse::<u64>()
                            .map_err(|_| format!("Invalid instruction limit: {}", value))?;
                        options.limit = Some(limit);
                    }
                }
                i += 2;
                continue;
            }
            "--trace" => options.trace = true,
            "--list" => options.list = true,
            "--words" => options.words = true,
            arg if arg.starts_with("--") => return Err(format!("Unknown option: {}", arg)),
            arg => {
                if options.source.is_some() {
                    return Err(format!("Unexpected argument: {}", arg));
                }
                options.source = Some(PathBuf::from(arg));
            }
        }
        i += 1;
    }
    Ok(options)
}

fn run(options: Options) -> Result<(), VmError> {
    let mut config = VmConfig::load(options.config.as_deref())?;
    if let Some(image) = options.image {
        config.image = image;
    }
    config.trace |= options.trace;
    if options.limit.is_some() {
        config.instruction_limit = options.limit;
    }
    debug!("{:?}", config);

    let mut image = Image::open(&config.image, config.memory_size)?;
    if image.existed() {
        info!("Resuming image {:?}", image.path());
        if options.source.is_some() {
            info!("Image exists; source file ignored");
        }
    } else {
        let source_path = match options.source {
            Some(p) => p,
            None => {
                image.discard()?;
                return Err(VmError::Config(
                    "no image yet and no source file to assemble".to_string(),
                ));
            }
        };
        let source = match fs::read_to_string(&source_path) {
            Ok(s) => s,
            Err(e) => {
                image.discard()?;
                return Err(VmError::Io(format!(
                    "cannot read source {:?}: {}",
                    source_path, e
                )));
            }
        };
        image = pvm::assemble_into(image, &source)?;
    }

    if options.words {
        let space = image.space();
        print!("{}", Dictionary::walk(space, space.cursors.hp)?);
    }
    if options.list {
        print!("{}", Disassembler::new(image.space()).listing()?);
    }

    let vm = VM::with_stacks(image.into_space(), config.return_stack, config.data_stack);
    let mut interpreter = Interpreter::new(vm);
    if config.trace {
        interpreter.add_observer(Box::new(TraceObserver::new(std::io::stderr())));
    }

    match interpreter.run_with_limit(config.instruction_limit)? {
        Outcome::Halted => debug!("bye"),
        Outcome::LimitReached => info!(
            "Stopped after {} instructions",
            interpreter.instruction_count()
        ),
    }
    Ok(())
}

fn main() {
    // Initialize logging
    env_logger::init();

    let args: Vec<String> = env::args().collect();
    if args.iter().any(|a| a == "-h" || a == "--help") {
        print_usage(&args[0]);
        return;
    }

    let options = match parse_args(&args) {
        Ok(options) => options,
        Err(e) => {
            eprintln!("Error: {}", e);
            print_usage(&args[0]);
            process::exit(2);
        }
    };

    if let Err(e) = run(options) {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}
