use crate::errors::FirewallError;
use crate::firewall::rule::{Rule, Target, Verdict};

/// Ordered rules with an optional default policy.
///
/// Built-in chains always carry a policy. A user chain without one hands the
/// packet back to the chain that jumped into it when no rule decides.
#[derive(Clone, Debug, PartialEq)]
pub struct Chain {
    name: String,
    pub policy: Option<Verdict>,
    rules: Vec<Rule>,
}

impl Chain {
    pub fn new(name: impl Into<String>, policy: Option<Verdict>) -> Self {
        Self {
            name: name.into(),
            policy,
            rules: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    pub fn append(&mut self, rule: Rule) {
        let rule = self.with_policy(rule);
        self.rules.push(rule);
    }

    /// Inserts before the rule at 1-based `index`. One past the end appends.
    pub fn insert(&mut self, index: usize, rule: Rule) -> Result<(), FirewallError> {
        if index == 0 || index > self.rules.len() + 1 {
            return Err(self.out_of_range(index));
        }

        let rule = self.with_policy(rule);
        self.rules.insert(index - 1, rule);
        Ok(())
    }

    pub fn delete(&mut self, index: usize) -> Result<Rule, FirewallError> {
        let position = self.position(index)?;
        Ok(self.rules.remove(position))
    }

    /// Deletes the first rule equal to `rule`.
    pub fn delete_matching(&mut self, rule: &Rule) -> Result<Rule, FirewallError> {
        let position = self
            .rules
            .iter()
            .position(|existing| existing == rule)
            .ok_or_else(|| FirewallError::RuleNotFound(rule.to_string()))?;

        Ok(self.rules.remove(position))
    }

    pub fn replace(&mut self, index: usize, rule: Rule) -> Result<Rule, FirewallError> {
        let position = self.position(index)?;
        let rule = self.with_policy(rule);
        Ok(std::mem::replace(&mut self.rules[position], rule))
    }

    pub fn flush(&mut self) {
        self.rules.clear();
    }

    // A rule without a target takes the policy the chain has when it is added
    fn with_policy(&self, mut rule: Rule) -> Rule {
        if rule.target.is_none() {
            rule.target = self.policy.map(Target::Verdict);
        }
        rule
    }

    fn position(&self, index: usize) -> Result<usize, FirewallError> {
        match index {
            1.. if index <= self.rules.len() => Ok(index - 1),
            _ => Err(self.out_of_range(index)),
        }
    }

    fn out_of_range(&self, index: usize) -> FirewallError {
        FirewallError::IndexOutOfRange {
            chain: self.name.clone(),
            index,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::Ipv4Addr;

    fn rule_to(port: u16, target: Option<Target>) -> Rule {
        Rule {
            port_destination: Some(port),
            target,
            ..Rule::new("INPUT")
        }
    }

    fn ports(chain: &Chain) -> Vec<Option<u16>> {
        chain.rules().iter().map(|rule| rule.port_destination).collect()
    }

    #[test]
    fn test_insert_positions() {
        let mut chain = Chain::new("INPUT", Some(Verdict::Accept));
        chain.append(rule_to(80, None));
        chain.insert(1, rule_to(22, None)).unwrap();
        chain.insert(3, rule_to(443, None)).unwrap();
        chain.insert(2, rule_to(25, None)).unwrap();

        assert_eq!(ports(&chain), vec![Some(22), Some(25), Some(80), Some(443)]);

        match chain.insert(0, rule_to(1, None)) {
            Err(FirewallError::IndexOutOfRange { chain, index }) => {
                assert_eq!(chain, "INPUT");
                assert_eq!(index, 0);
            },
            other => panic!("unexpected result: {other:?}"),
        }
        assert!(chain.insert(6, rule_to(1, None)).is_err());
        assert_eq!(chain.rules().len(), 4);
    }

    #[test]
    fn test_delete_and_replace() {
        let mut chain = Chain::new("INPUT", Some(Verdict::Accept));
        for port in [22, 80, 443] {
            chain.append(rule_to(port, Some(Target::Verdict(Verdict::Drop))));
        }

        let removed = chain.delete(2).unwrap();
        assert_eq!(removed.port_destination, Some(80));
        assert_eq!(ports(&chain), vec![Some(22), Some(443)]);

        let replaced = chain.replace(1, rule_to(8080, None)).unwrap();
        assert_eq!(replaced.port_destination, Some(22));
        assert_eq!(ports(&chain), vec![Some(8080), Some(443)]);

        assert!(matches!(
            chain.delete(3),
            Err(FirewallError::IndexOutOfRange { index: 3, .. })
        ));
        assert!(chain.replace(0, rule_to(1, None)).is_err());
    }

    #[test]
    fn test_delete_matching() {
        let mut chain = Chain::new("INPUT", None);
        let rule = Rule {
            source: Some(Ipv4Addr::new(10, 0, 0, 1).into()),
            target: Some(Target::Verdict(Verdict::Drop)),
            ..Rule::new("INPUT")
        };
        chain.append(rule_to(80, Some(Target::Verdict(Verdict::Accept))));
        chain.append(rule.clone());

        assert_eq!(chain.delete_matching(&rule).unwrap(), rule);
        assert_eq!(chain.rules().len(), 1);
        assert!(matches!(
            chain.delete_matching(&rule),
            Err(FirewallError::RuleNotFound(_))
        ));
    }

    #[test]
    fn test_rule_without_target_takes_policy() {
        let mut chain = Chain::new("chain3", Some(Verdict::Drop));
        chain.append(rule_to(80, None));

        let mut user = Chain::new("chain2", None);
        user.append(rule_to(80, None));

        assert_eq!(chain.rules()[0].target, Some(Target::Verdict(Verdict::Drop)));
        assert_eq!(user.rules()[0].target, None);
    }

    #[test]
    fn test_flush_keeps_policy() {
        let mut chain = Chain::new("INPUT", Some(Verdict::Drop));
        chain.append(rule_to(80, None));
        chain.flush();

        assert!(chain.rules().is_empty());
        assert_eq!(chain.policy, Some(Verdict::Drop));
        assert_eq!(chain.name(), "INPUT");
    }
}
