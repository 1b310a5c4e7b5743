use std::str::FromStr;

use clap::{crate_description, crate_name, crate_version, value_parser, Arg, ArgMatches, Command};

use veil_core::transport::HopKind;
use veil_packet::NodeId;

/// Which participant this process runs.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Role {
    /// The node directory.
    Registry,
    /// An onion relay.
    Relay,
    /// A sender/receiver of messages.
    User,
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "registry" => Ok(Role::Registry),
            "relay" => Ok(Role::Relay),
            "user" => Ok(Role::User),
            _ => Err(format!("Unknown role: {}", s)),
        }
    }
}

/// How node identities map to HTTP endpoints. Ports are an addressing
/// scheme only; hop classification never looks at them.
#[derive(Clone, Debug)]
pub struct Addressing {
    /// Host every participant binds to and is reached at.
    pub host: String,
    /// Relay with id `n` listens on `relay_base_port + n`.
    pub relay_base_port: u16,
    /// User with id `n` listens on `user_base_port + n`.
    pub user_base_port: u16,
}

impl Addressing {
    /// Port a participant of the given kind and id listens on. `None` if
    /// the id pushes the port out of range.
    pub fn port(&self, id: NodeId, kind: HopKind) -> Option<u16> {
        let base = match kind {
            HopKind::Relay => self.relay_base_port,
            HopKind::User => self.user_base_port,
        };
        u16::try_from(u64::from(base) + id.0).ok()
    }

    /// Message endpoint of a participant.
    pub fn message_url(&self, id: NodeId, kind: HopKind) -> Option<String> {
        self.port(id, kind).map(|port| format!("http://{}:{}/message", self.host, port))
    }
}

/// Config parsed from command line arguments.
#[derive(Clone, Debug)]
pub struct NodeConfig {
    /// Role of this process.
    pub role: Role,
    /// Identity of this participant. Ignored by the registry role.
    pub id: NodeId,
    /// Port the registry listens on.
    pub registry_port: u16,
    /// Base URL of the registry, derived from host and registry port.
    pub registry_url: String,
    /// Identity-to-endpoint mapping.
    pub addressing: Addressing,
}

impl NodeConfig {
    /// Port this process binds to.
    pub fn bind_port(&self) -> Option<u16> {
        match self.role {
            Role::Registry => Some(self.registry_port),
            Role::Relay => self.addressing.port(self.id, HopKind::Relay),
            Role::User => self.addressing.port(self.id, HopKind::User),
        }
    }
}

fn app() -> Command {
    Command::new(crate_name!())
        .version(crate_version!())
        .about(crate_description!())
        .arg(Arg::new("role")
            .short('r')
            .long("role")
            .help("Which participant to run: the node registry, an onion \
                   relay or a user")
            .num_args(1)
            .value_parser(value_parser!(Role))
            .required(true))
        .arg(Arg::new("id")
            .short('i')
            .long("id")
            .help("Identity of this relay or user. Ignored by the registry")
            .num_args(1)
            .value_parser(value_parser!(NodeId))
            .required_if_eq_any([("role", "relay"), ("role", "user")]))
        .arg(Arg::new("host")
            .long("host")
            .help("Host every participant binds to and is reached at")
            .num_args(1)
            .env("VEIL_HOST")
            .default_value("127.0.0.1"))
        .arg(Arg::new("registry-port")
            .long("registry-port")
            .help("Port the node registry listens on")
            .num_args(1)
            .value_parser(value_parser!(u16))
            .default_value("8080"))
        .arg(Arg::new("relay-base-port")
            .long("relay-base-port")
            .help("Relay with id n listens on this port plus n")
            .num_args(1)
            .value_parser(value_parser!(u16))
            .default_value("4000"))
        .arg(Arg::new("user-base-port")
            .long("user-base-port")
            .help("User with id n listens on this port plus n")
            .num_args(1)
            .value_parser(value_parser!(u16))
            .default_value("5000"))
}

fn run_args(matches: &ArgMatches) -> NodeConfig {
    let role = *matches.get_one::<Role>("role").expect("role is required");
    let id = matches.get_one::<NodeId>("id").copied().unwrap_or(NodeId(0));
    let host = matches.get_one::<String>("host").expect("host has a default").clone();
    let registry_port = *matches.get_one::<u16>("registry-port").expect("registry-port has a default");
    let relay_base_port = *matches.get_one::<u16>("relay-base-port").expect("relay-base-port has a default");
    let user_base_port = *matches.get_one::<u16>("user-base-port").expect("user-base-port has a default");

    NodeConfig {
        role,
        id,
        registry_port,
        registry_url: format!("http://{}:{}", host, registry_port),
        addressing: Addressing {
            host,
            relay_base_port,
            user_base_port,
        },
    }
}

/// Parse command line arguments.
pub fn cli_parse() -> NodeConfig {
    run_args(&app().get_matches())
}
