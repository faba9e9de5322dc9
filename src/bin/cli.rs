use clap::{App, AppSettings, Arg, ArgMatches, SubCommand};
use shmblock::{
    config::{DEFAULT_BASE_PATH, DEFAULT_VALUE, MULTIBYTE_SLOT_WIDTH},
    BlockConfig, FramingMode, Result, ShmError, SharedMemoryBlock,
};

fn block_args<'a, 'b>() -> Vec<Arg<'a, 'b>> {
    vec![
        Arg::with_name("base")
            .long("base")
            .value_name("DIR")
            .help("Base directory for backing files")
            .default_value(DEFAULT_BASE_PATH)
            .takes_value(true),
        Arg::with_name("segment")
            .short("p")
            .long("segment")
            .value_name("SEGMENT")
            .help("Object path segment below the base directory")
            .default_value("")
            .takes_value(true),
        Arg::with_name("file")
            .short("f")
            .long("file")
            .value_name("FILE")
            .help("Backing file name")
            .required(true)
            .takes_value(true),
        Arg::with_name("capacity")
            .short("c")
            .long("capacity")
            .value_name("SLOTS")
            .help("Number of character slots")
            .default_value("64")
            .takes_value(true),
        Arg::with_name("fixed")
            .long("fixed")
            .help("Use fixed-length slots instead of terminated records"),
        Arg::with_name("fill")
            .long("fill")
            .value_name("CHAR")
            .help("Fill character for fixed-length blocks")
            .default_value(" ")
            .takes_value(true),
        Arg::with_name("encoding")
            .short("e")
            .long("encoding")
            .value_name("ENCODING")
            .help("Text encoding (utf-8, ascii, latin-1)")
            .default_value("utf-8")
            .takes_value(true),
        Arg::with_name("serialize")
            .long("serialize")
            .help("Exchange JSON values instead of raw text"),
        Arg::with_name("default")
            .long("default")
            .value_name("VALUE")
            .help("Initial content of a newly created backing file")
            .default_value(DEFAULT_VALUE)
            .takes_value(true),
    ]
}

fn main() -> Result<()> {
    env_logger::init();

    let matches = App::new("shmblock-cli")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Read and write framed shared memory blocks")
        .setting(AppSettings::SubcommandRequiredElseHelp)
        .subcommand(
            SubCommand::with_name("write")
                .about("Write a value into a block")
                .args(&block_args())
                .arg(
                    Arg::with_name("value")
                        .help("Text to write, or JSON with --serialize")
                        .required(true)
                        .index(1),
                )
                .arg(start_arg()),
        )
        .subcommand(
            SubCommand::with_name("read")
                .about("Read a value from a block")
                .args(&block_args())
                .arg(
                    Arg::with_name("count")
                        .short("n")
                        .long("count")
                        .value_name("SLOTS")
                        .help("Slots to read (fixed-length blocks)")
                        .default_value("1")
                        .takes_value(true),
                )
                .arg(start_arg()),
        )
        .subcommand(
            SubCommand::with_name("clear")
                .about("Blank a block")
                .args(&block_args())
                .arg(start_arg()),
        )
        .subcommand(SubCommand::with_name("info").about("Show version and protocol constants"))
        .get_matches();

    match matches.subcommand() {
        ("write", Some(sub)) => handle_write(sub),
        ("read", Some(sub)) => handle_read(sub),
        ("clear", Some(sub)) => handle_clear(sub),
        ("info", Some(_)) => show_info(),
        _ => {
            println!("Use --help for usage information");
            Ok(())
        }
    }
}

fn start_arg<'a, 'b>() -> Arg<'a, 'b> {
    Arg::with_name("start")
        .short("s")
        .long("start")
        .value_name("SLOT")
        .help("Slot to start at")
        .default_value("0")
        .takes_value(true)
}

fn parse_usize(matches: &ArgMatches, name: &str) -> Result<usize> {
    matches
        .value_of(name)
        .unwrap_or_default()
        .parse()
        .map_err(|_| ShmError::invalid_parameter(name, "expected a non-negative integer"))
}

fn open_block(matches: &ArgMatches) -> Result<SharedMemoryBlock> {
    let mut fill = matches.value_of("fill").unwrap_or(" ").chars();
    let fill_char = match (fill.next(), fill.next()) {
        (Some(c), None) => c,
        _ => {
            return Err(ShmError::invalid_parameter(
                "fill",
                "expected exactly one character",
            ))
        }
    };

    let mode = if matches.is_present("fixed") {
        FramingMode::FixedLength
    } else {
        FramingMode::Terminated
    };

    let config = BlockConfig::new(parse_usize(matches, "capacity")?)
        .with_mode(mode)
        .with_fill_char(fill_char)
        .with_encoding_label(matches.value_of("encoding").unwrap_or("utf-8"))?
        .with_serialize(matches.is_present("serialize"))
        .with_label("cli");

    let mut block = SharedMemoryBlock::new(config)?;
    block.create(
        matches.value_of("base").unwrap_or(DEFAULT_BASE_PATH),
        matches.value_of("segment").unwrap_or_default(),
        matches.value_of("file").unwrap_or_default(),
        matches.value_of("default").unwrap_or(DEFAULT_VALUE),
    )?;
    Ok(block)
}

/// Run `op` against the block and close it on every path
fn with_block<T>(matches: &ArgMatches, op: impl FnOnce(&mut SharedMemoryBlock) -> Result<T>) -> Result<T> {
    let mut block = open_block(matches)?;
    let result = op(&mut block);
    let closed = block.close();
    let value = result?;
    closed?;
    Ok(value)
}

fn handle_write(matches: &ArgMatches) -> Result<()> {
    let value = matches.value_of("value").unwrap_or_default();
    let start = parse_usize(matches, "start")?;
    let serialize = matches.is_present("serialize");

    with_block(matches, |block| {
        if serialize {
            let json: serde_json::Value = serde_json::from_str(value)
                .map_err(|e| ShmError::invalid_parameter("value", e.to_string()))?;
            block.write_value(&json, start)?;
        } else {
            block.write(value, start)?;
        }
        block.flush()
    })?;

    println!("Wrote {} at slot {}", value, start);
    Ok(())
}

fn handle_read(matches: &ArgMatches) -> Result<()> {
    let count = parse_usize(matches, "count")?;
    let start = parse_usize(matches, "start")?;
    let serialize = matches.is_present("serialize");

    let output = with_block(matches, |block| {
        if serialize {
            Ok(block
                .read_value::<serde_json::Value>(count, start)?
                .map(|v| v.to_string())
                .unwrap_or_default())
        } else {
            block.read(count, start)
        }
    })?;

    println!("{}", output);
    Ok(())
}

fn handle_clear(matches: &ArgMatches) -> Result<()> {
    let start = parse_usize(matches, "start")?;
    with_block(matches, |block| {
        block.clear(start)?;
        block.flush()
    })?;
    println!("Cleared");
    Ok(())
}

fn show_info() -> Result<()> {
    println!("shmblock v{}", shmblock::VERSION);
    println!("Base directory: {}", DEFAULT_BASE_PATH);
    println!("Default file content: {:?}", DEFAULT_VALUE);
    println!("Terminator byte: {:#04x}", shmblock::config::TERMINATOR);
    println!(
        "Fixed-length slot width: {} bytes under utf-8, 1 otherwise",
        MULTIBYTE_SLOT_WIDTH
    );
    Ok(())
}
