//! Command line definition for the admin tool

use clap::{value_parser, Arg, ArgAction, Command};

fn id_arg(name: &'static str, help: &'static str) -> Arg {
    Arg::new(name)
        .long(name)
        .value_name("ID")
        .help(help)
        .required(true)
        .value_parser(value_parser!(i64))
}

pub fn cli() -> Command {
    Command::new("approval-admin")
        .version("1.0.0")
        .about("Project approval chain administration")
        .subcommand_required(true)
        .arg(
            Arg::new("config")
                .long("config")
                .short('c')
                .value_name("FILE")
                .help("Configuration file path (JSON)")
                .global(true)
        )
        .arg(
            Arg::new("database")
                .long("database")
                .short('d')
                .value_name("FILE")
                .env("APPROVAL_DATABASE")
                .help("SQLite database path, overrides the configuration file")
                .global(true)
        )
        .subcommand(Command::new("init").about("Create the database schema and print table counts"))
        .subcommand(
            Command::new("add-project")
                .about("Register a project")
                .arg(Arg::new("name").long("name").required(true).help("Project name"))
                .arg(id_arg("owner", "Owner user id"))
                .arg(Arg::new("ticket-prefix").long("ticket-prefix").required(true).help("Ticket prefix"))
                .arg(Arg::new("description").long("description").default_value(""))
                .arg(
                    Arg::new("status-id")
                        .long("status-id")
                        .default_value("1")
                        .value_parser(value_parser!(i64))
                )
                .arg(Arg::new("status-type").long("status-type").default_value("default"))
                .arg(Arg::new("type").long("type").default_value("project"))
        )
        .subcommand(
            Command::new("add-member")
                .about("Add a user to a project")
                .arg(id_arg("project", "Project id"))
                .arg(id_arg("user", "User id"))
        )
        .subcommand(
            Command::new("assign-role")
                .about("Grant a role to a user")
                .arg(id_arg("user", "User id"))
                .arg(Arg::new("role").long("role").required(true).help("Role name"))
        )
        .subcommand(
            Command::new("create-chain")
                .about("Create the approval chain of a project")
                .arg(id_arg("project", "Project id"))
        )
        .subcommand(
            Command::new("approve")
                .about("Approve a step as the given user and forward the chain")
                .arg(id_arg("step", "Approval step id"))
                .arg(id_arg("user", "Acting user id"))
        )
        .subcommand(
            Command::new("show-chain")
                .about("Show a project's approval chain and its progress")
                .arg(id_arg("project", "Project id"))
                .arg(
                    Arg::new("user")
                        .long("user")
                        .value_name("ID")
                        .help("Render the approve action as seen by this user")
                        .value_parser(value_parser!(i64))
                )
        )
        .subcommand(
            Command::new("list-chains")
                .about("List all approval chains")
                .arg(
                    Arg::new("pending")
                        .long("pending")
                        .help("Only chains that still have unapproved steps")
                        .action(ArgAction::SetTrue)
                )
        )
}
