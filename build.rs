// build.rs

use clap::{Arg, ArgAction, Command};
use clap_mangen::Man;
use std::env;
use std::fs;
use std::path::PathBuf;

fn db_args(cmd: Command) -> Command {
    cmd.arg(
        Arg::new("db_path")
            .short('d')
            .long("db-path")
            .value_name("PATH")
            .default_value("/var/lib/rpm/Packages")
            .help("Database path"),
    )
    .arg(
        Arg::new("background")
            .long("background")
            .action(ArgAction::SetTrue)
            .help("Read pages on a background thread"),
    )
    .arg(
        Arg::new("parallel")
            .long("parallel")
            .action(ArgAction::SetTrue)
            .help("Decode headers in parallel"),
    )
    .arg(
        Arg::new("skip_invalid")
            .long("skip-invalid")
            .action(ArgAction::SetTrue)
            .help("Skip malformed package headers instead of failing"),
    )
    .arg(
        Arg::new("json")
            .long("json")
            .action(ArgAction::SetTrue)
            .help("Print JSON instead of text"),
    )
}

fn build_cli() -> Command {
    Command::new("rpmdb")
        .version(env!("CARGO_PKG_VERSION"))
        .author("rpmdb Contributors")
        .about("Read the Berkeley DB rpm installed-package database")
        .subcommand_required(false)
        .subcommand(db_args(Command::new("list").about("List installed packages")))
        .subcommand(db_args(
            Command::new("info")
                .about("Show details of installed packages with this name")
                .arg(Arg::new("package_name").required(true).help("Package name")),
        ))
        .subcommand(db_args(
            Command::new("files")
                .about("List the files of an installed package")
                .arg(Arg::new("package_name").required(true).help("Package name")),
        ))
        .subcommand(db_args(
            Command::new("verify")
                .about("Verify installed files match their recorded sizes and digests")
                .arg(Arg::new("package_name").help("Package name to verify (optional)"))
                .arg(
                    Arg::new("root")
                        .short('r')
                        .long("root")
                        .default_value("/")
                        .help("Install root directory"),
                ),
        ))
        .subcommand(
            Command::new("completions")
                .about("Generate shell completion scripts")
                .arg(
                    Arg::new("shell")
                        .required(true)
                        .value_parser(["bash", "elvish", "fish", "powershell", "zsh"])
                        .help("Shell type"),
                ),
        )
}

fn main() {
    println!("cargo:rerun-if-changed=build.rs");

    // Create man directory
    let out_dir = PathBuf::from(env::var("CARGO_MANIFEST_DIR").unwrap());
    let man_dir = out_dir.join("man");
    fs::create_dir_all(&man_dir).expect("Failed to create man directory");

    // Generate main man page
    let cmd = build_cli();
    let man = Man::new(cmd);
    let mut buffer = Vec::new();
    man.render(&mut buffer).expect("Failed to render man page");

    let man_path = man_dir.join("rpmdb.1");
    fs::write(&man_path, buffer).expect("Failed to write man page");
}
