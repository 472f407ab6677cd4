//! Cartridge injection driver.
//!
//! Loads a menu manifest, lists it or launches one entry into an in-memory
//! target, and reports what the cartridge did to the bus.

use std::fs;
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, bail};
use cart_inject::{Handoff, LoadError, Menu, Outcome, RunCommand, RunPolicy, TargetMemory};
use clap::{Parser, ValueEnum};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(
    name = "cart-inject",
    about = "Classify, load and launch firmware images from a cartridge menu."
)]
struct Args {
    /// Menu manifest (JSON)
    manifest: PathBuf,

    /// Print the menu table and exit
    #[arg(long, action = clap::ArgAction::SetTrue)]
    list: bool,

    /// Menu index to launch
    #[arg(long, value_name = "INDEX")]
    select: Option<usize>,

    /// Override the manifest's run policy for PRG images
    #[arg(long, value_enum)]
    policy: Option<PolicyArg>,

    /// Write the 64 KiB target address space to this file after launch
    #[arg(long, value_name = "PATH")]
    dump: Option<PathBuf>,

    /// Print the launch report as JSON
    #[arg(long, action = clap::ArgAction::SetTrue)]
    json: bool,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum PolicyArg {
    Auto,
    Run,
    Sys,
    None,
}

impl From<PolicyArg> for RunPolicy {
    fn from(arg: PolicyArg) -> Self {
        match arg {
            PolicyArg::Auto => Self::Auto,
            PolicyArg::Run => Self::Run,
            PolicyArg::Sys => Self::Sys,
            PolicyArg::None => Self::None,
        }
    }
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    match run(Args::parse()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("cart-inject: {err:#}");
            ExitCode::FAILURE
        }
    }
}

fn run(args: Args) -> anyhow::Result<()> {
    let menu = Menu::load(&args.manifest)
        .with_context(|| format!("loading menu {}", args.manifest.display()))?;

    let Some(index) = args.select.filter(|_| !args.list) else {
        print_menu(&menu);
        return Ok(());
    };
    let Some(item) = menu.get(index) else {
        bail!("no menu entry {index} (menu has {})", menu.len());
    };

    let policy = args.policy.map_or(menu.run_policy(), RunPolicy::from);
    let mut handoff = Handoff::new(TargetMemory::new(), policy);

    let launch = match handoff.select(item) {
        Ok(Outcome::Launched(launch)) => launch,
        Ok(Outcome::Ignored) => {
            println!("{:?} is a separator; nothing loaded", item.label);
            return Ok(());
        }
        Err(err) => return Err(report(&item.label, err)),
    };

    let delivered = handoff
        .boot_completed()
        .map_err(|err| report(&item.label, err))?;

    if args.json {
        let doc = serde_json::json!({
            "launch": launch,
            "status": handoff.status(),
        });
        println!("{}", serde_json::to_string_pretty(&doc)?);
    } else {
        println!("launched {:?} ({})", launch.label, launch.kind);
        println!("  mode:    {} {}", launch.mode, launch.lines);
        println!("  written: {} bytes", launch.bytes_written);
        if launch.banks > 0 {
            println!("  banks:   {}", launch.banks);
        }
        match launch.entry {
            Some(addr) => println!("  entry:   ${addr:04X}"),
            None => println!("  entry:   none (Kernal boot)"),
        }
        if let Some(command) = delivered {
            println!("  typed:   {}", show_command(command));
        }
    }

    if let Some(path) = &args.dump {
        fs::write(path, handoff.bus().ram())
            .with_context(|| format!("writing {}", path.display()))?;
    }
    Ok(())
}

fn print_menu(menu: &Menu) {
    for (index, item) in menu.items().iter().enumerate() {
        let kind = item
            .kind()
            .map_or_else(|_| format!("tag {}", item.kind_tag), |k| k.to_string());
        let len = item.data.as_ref().map_or(0, |d| d.len());
        if item.is_selectable() {
            println!("{index:>3}  {kind:<9} {len:>6}  {}", item.label);
        } else {
            println!("     {}", item.label);
        }
    }
}

fn show_command(command: RunCommand) -> String {
    let mut text = command.to_string();
    text.push_str("<RETURN>");
    text
}

fn report(label: &str, err: LoadError) -> anyhow::Error {
    anyhow::Error::new(err).context(format!("launching {label:?}"))
}
