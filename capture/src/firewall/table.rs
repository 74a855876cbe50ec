use crate::errors::{FirewallError, RuleError};
use crate::firewall::chain::Chain;
use crate::firewall::rule::{Rule, Target, Verdict};
use crate::record::Summary;
use std::collections::{HashMap, HashSet};
use std::fmt::{Display, Formatter};
use std::net::Ipv4Addr;
use std::path::Path;
use std::str::FromStr;

pub const BUILT_IN_CHAINS: [&str; 3] = ["INPUT", "FORWARD", "OUTPUT"];
const MAX_JUMP_DEPTH: usize = 32;

/// One line of a rules file.
#[derive(Clone, Debug, PartialEq)]
pub enum Command {
    Policy { chain: String, verdict: Verdict },
    NewChain(String),
    // All chains when no name is given
    Flush(Option<String>),
    Append(Rule),
    Insert { index: usize, rule: Rule },
    Delete { chain: String, index: usize },
    DeleteRule(Rule),
    Replace { index: usize, rule: Rule },
}

impl Command {
    /// Parses an iptables command line. Blank and comment lines give `None`.
    pub fn parse(line: &str) -> Result<Option<Self>, RuleError> {
        let tokens = tokenize(line)?;
        let tokens = match tokens.split_first() {
            Some((first, rest)) if first == "iptables" => rest,
            _ => tokens.as_slice(),
        };
        let Some((command, arguments)) = tokens.split_first() else {
            return Ok(None);
        };

        let command = match command.as_str() {
            "-P" | "--policy" => {
                let (chain, rest) = chain_name(command, arguments)?;
                let policy = match rest {
                    [policy] => policy,
                    [] => return Err(RuleError::MissingArgument(command.clone())),
                    [_, extra, ..] => return Err(RuleError::UnknownOption(extra.clone())),
                };
                let verdict = match Verdict::from_str(policy) {
                    Ok(verdict @ (Verdict::Accept | Verdict::Drop)) => verdict,
                    _ => {
                        return Err(RuleError::InvalidValue {
                            option: command.clone(),
                            value: policy.clone(),
                        });
                    },
                };
                Self::Policy {
                    chain: chain.to_string(),
                    verdict,
                }
            },
            "-N" | "--new-chain" => {
                let (chain, _) = chain_name(command, arguments)?;
                Self::NewChain(chain.to_string())
            },
            "-F" | "--flush" => Self::Flush(arguments.first().cloned()),
            "-A" | "--append" => {
                let (chain, options) = chain_name(command, arguments)?;
                Self::Append(Rule::parse(chain, options)?)
            },
            "-I" | "--insert" => {
                let (chain, rest) = chain_name(command, arguments)?;
                let (index, options) = leading_index(rest);
                Self::Insert {
                    index: index.unwrap_or(1),
                    rule: Rule::parse(chain, options)?,
                }
            },
            "-D" | "--delete" => {
                let (chain, rest) = chain_name(command, arguments)?;
                match leading_index(rest) {
                    (Some(index), []) => Self::Delete {
                        chain: chain.to_string(),
                        index,
                    },
                    _ => Self::DeleteRule(Rule::parse(chain, rest)?),
                }
            },
            "-R" | "--replace" => {
                let (chain, rest) = chain_name(command, arguments)?;
                let (Some(index), options) = leading_index(rest) else {
                    return Err(RuleError::MissingArgument(command.clone()));
                };
                Self::Replace {
                    index,
                    rule: Rule::parse(chain, options)?,
                }
            },
            other => return Err(RuleError::UnknownCommand(other.to_string())),
        };

        Ok(Some(command))
    }
}

/// Splits a line on whitespace. Double quotes group words, `#` outside quotes
/// starts a comment.
pub fn tokenize(line: &str) -> Result<Vec<String>, RuleError> {
    let mut tokens = Vec::new();
    let mut current: Option<String> = None;
    let mut characters = line.chars();

    while let Some(character) = characters.next() {
        match character {
            '#' => break,
            '"' => {
                let token = current.get_or_insert_with(String::new);
                loop {
                    match characters.next() {
                        Some('"') => break,
                        Some(value) => token.push(value),
                        None => return Err(RuleError::UnterminatedQuote),
                    }
                }
            },
            value if value.is_whitespace() => tokens.extend(current.take()),
            value => current.get_or_insert_with(String::new).push(value),
        }
    }
    tokens.extend(current.take());

    Ok(tokens)
}

fn chain_name<'a>(
    command: &str, arguments: &'a [String],
) -> Result<(&'a str, &'a [String]), RuleError> {
    match arguments.split_first() {
        Some((chain, rest)) if !chain.starts_with('-') => Ok((chain.as_str(), rest)),
        _ => Err(RuleError::MissingArgument(command.to_string())),
    }
}

fn leading_index(tokens: &[String]) -> (Option<usize>, &[String]) {
    match tokens.split_first() {
        Some((first, rest)) => match first.parse::<usize>() {
            Ok(index) => (Some(index), rest),
            Err(_) => (None, tokens),
        },
        None => (None, tokens),
    }
}

/// Address and port pair of an accepted packet.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub struct Flow {
    pub address_source: Ipv4Addr,
    pub port_source: u16,
    pub address_destination: Ipv4Addr,
    pub port_destination: u16,
}

impl Flow {
    pub fn of(summary: &Summary) -> Option<Self> {
        Some(Self {
            address_source: summary.address_source?,
            port_source: summary.port_source?,
            address_destination: summary.address_destination?,
            port_destination: summary.port_destination?,
        })
    }
}

impl Display for Flow {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}:{} -> {}:{}",
            self.address_source, self.port_source, self.address_destination, self.port_destination
        )
    }
}

/// Named chains plus the flows accepted so far.
#[derive(Clone, Debug)]
pub struct Table {
    chains: HashMap<String, Chain>,
    established: HashSet<Flow>,
}

impl Default for Table {
    fn default() -> Self {
        let chains = BUILT_IN_CHAINS
            .iter()
            .map(|name| (name.to_string(), Chain::new(*name, Some(Verdict::Accept))))
            .collect();

        Self {
            chains,
            established: HashSet::new(),
        }
    }
}

impl Table {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, FirewallError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(FirewallError::FileNotFound(path.to_path_buf()));
        }

        let text = std::fs::read_to_string(path)?;
        let mut table = Self::new();
        table.load(&text)?;

        log::info!("Loaded {} rules from {}", table.rule_count(), path.display());
        Ok(table)
    }

    /// Applies every command of a rules file, in order.
    pub fn load(&mut self, text: &str) -> Result<(), FirewallError> {
        for (number, line) in text.lines().enumerate() {
            let line_number = number + 1;
            let command = Command::parse(line).map_err(|source| FirewallError::InvalidRule {
                line: line_number,
                source,
            })?;

            if let Some(command) = command {
                self.apply(command)
                    .inspect_err(|_| log::error!("Rules file line {line_number} rejected"))?;
            }
        }

        Ok(())
    }

    pub fn apply(&mut self, command: Command) -> Result<(), FirewallError> {
        log::trace!("Applying {command:?}");

        match command {
            Command::Policy { chain, verdict } => {
                self.chain_mut(&chain)?.policy = Some(verdict);
            },
            Command::NewChain(name) => {
                if self.chains.contains_key(&name) {
                    return Err(FirewallError::ChainExists(name));
                }
                self.chains.insert(name.clone(), Chain::new(name, None));
            },
            Command::Flush(None) => self.chains.values_mut().for_each(Chain::flush),
            Command::Flush(Some(chain)) => self.chain_mut(&chain)?.flush(),
            Command::Append(rule) => {
                self.check_target(&rule)?;
                self.chain_mut(&rule.chain)?.append(rule);
            },
            Command::Insert { index, rule } => {
                self.check_target(&rule)?;
                self.chain_mut(&rule.chain)?.insert(index, rule)?;
            },
            Command::Delete { chain, index } => {
                self.chain_mut(&chain)?.delete(index)?;
            },
            Command::DeleteRule(rule) => {
                self.chain_mut(&rule.chain)?.delete_matching(&rule)?;
            },
            Command::Replace { index, rule } => {
                self.check_target(&rule)?;
                self.chain_mut(&rule.chain)?.replace(index, rule)?;
            },
        }

        Ok(())
    }

    pub fn chain(&self, name: &str) -> Option<&Chain> {
        self.chains.get(name)
    }

    pub fn rule_count(&self) -> usize {
        self.chains.values().map(|chain| chain.rules().len()).sum()
    }

    pub fn is_established(&self, flow: &Flow) -> bool {
        self.established.contains(flow)
    }

    /// Runs `summary` through `chain` and returns the decision.
    ///
    /// Rules are tried in order and the first one with a deciding target wins.
    /// `LOG` rules only log, a jump into a chain that decides nothing carries on
    /// with the next rule of the caller, and a chain without a policy accepts.
    /// An accepted packet with addresses and ports marks its flow as
    /// established for the packets that follow.
    pub fn process(&mut self, chain: &str, summary: &Summary) -> Result<Verdict, FirewallError> {
        let flow = Flow::of(summary);
        let established = flow.is_some_and(|flow| self.is_established(&flow));

        let verdict = self
            .evaluate(chain, summary, established, 0)?
            .unwrap_or(Verdict::Accept);

        match (verdict, flow) {
            (Verdict::Accept, Some(flow)) if self.established.insert(flow) => {
                log::debug!("Flow {flow} established");
            },
            _ => {},
        }

        Ok(verdict)
    }

    fn evaluate(
        &self, name: &str, summary: &Summary, established: bool, depth: usize,
    ) -> Result<Option<Verdict>, FirewallError> {
        if depth > MAX_JUMP_DEPTH {
            return Err(FirewallError::JumpLoop(name.to_string()));
        }
        let chain = self
            .chain(name)
            .ok_or_else(|| FirewallError::UnknownChain(name.to_string()))?;

        for rule in chain.rules().iter().filter(|rule| rule.matches(summary, established)) {
            match &rule.target {
                Some(Target::Verdict(verdict)) => return Ok(Some(*verdict)),
                Some(Target::Log { prefix }) => log_packet(prefix.as_deref(), summary),
                Some(Target::Jump(target)) => {
                    if let Some(verdict) = self.evaluate(target, summary, established, depth + 1)? {
                        return Ok(Some(verdict));
                    }
                },
                None => {},
            }
        }

        Ok(chain.policy)
    }

    fn chain_mut(&mut self, name: &str) -> Result<&mut Chain, FirewallError> {
        self.chains
            .get_mut(name)
            .ok_or_else(|| FirewallError::UnknownChain(name.to_string()))
    }

    fn check_target(&self, rule: &Rule) -> Result<(), FirewallError> {
        match &rule.target {
            Some(Target::Jump(target)) if !self.chains.contains_key(target) => {
                Err(FirewallError::UnknownChain(target.clone()))
            },
            _ => Ok(()),
        }
    }
}

fn log_packet(prefix: Option<&str>, summary: &Summary) {
    let field = |value: Option<String>| value.unwrap_or_else(|| "-".to_string());

    log::info!(
        "{}SRC={} DST={} PROTO={} SPT={} DPT={}",
        prefix.unwrap_or_default(),
        field(summary.address_source.map(|value| value.to_string())),
        field(summary.address_destination.map(|value| value.to_string())),
        field(summary.transport.map(|value| value.to_string())),
        field(summary.port_source.map(|value| value.to_string())),
        field(summary.port_destination.map(|value| value.to_string())),
    );
}
