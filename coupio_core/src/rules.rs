use crate::{action::Action, card::Card};

/// Whether a declared action names another player.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TargetRule {
    Forbidden,
    Required,
    Optional,
}

/// What happens when an action survives the reaction window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Effect {
    /// Gain coins from the treasury.
    Gain(u8),
    /// The target loses one influence.
    Kill,
    /// Transfer up to this many coins from the target.
    Steal(u8),
    /// Draw this many cards and exchange with the deck.
    Exchange(usize),
    /// With a target: inspect one of their cards. Without: exchange.
    ExchangeOrInspect(usize),
}

/// One row of the rule table: when an action may be declared and what it
/// does. The claim is derived from the declared form, so a rule for
/// `Action::Claim(..)` is challengeable and anything else is not.
#[derive(Debug, Clone)]
pub struct ActionRule {
    pub action: Action,
    pub min_coins: u8,
    /// Declarable only while the actor's coins stay below this bound.
    pub max_coins: Option<u8>,
    /// Paid when the effect runs; a blocked action costs nothing.
    pub cost: u8,
    pub target: TargetRule,
    pub blocked_by: Vec<Card>,
    pub effect: Effect,
}

impl ActionRule {
    pub fn claim(&self) -> Option<Card> {
        match self.action {
            Action::Claim(card) => Some(card),
            _ => None,
        }
    }

    pub fn challengeable(&self) -> bool {
        self.claim().is_some()
    }

    /// Does declaring this action open a reaction window at all?
    pub fn reactable(&self) -> bool {
        self.challengeable() || !self.blocked_by.is_empty()
    }
}

/// The full variant-specific rule table: deck composition plus one rule per
/// declarable action. Built once and handed to the engine as configuration;
/// the protocols themselves never hard-code a role.
#[derive(Debug, Clone)]
pub struct Ruleset {
    pub roles: Vec<Card>,
    pub copies_per_role: usize,
    pub actions: Vec<ActionRule>,
}

impl Ruleset {
    /// The classic five-role game.
    pub fn standard() -> Self {
        Ruleset {
            roles: vec![
                Card::Duke,
                Card::Assassin,
                Card::Captain,
                Card::Ambassador,
                Card::Contessa,
            ],
            copies_per_role: 3,
            actions: vec![
                ActionRule {
                    action: Action::Income,
                    min_coins: 0,
                    max_coins: Some(10),
                    cost: 0,
                    target: TargetRule::Forbidden,
                    blocked_by: vec![],
                    effect: Effect::Gain(1),
                },
                ActionRule {
                    action: Action::ForeignAid,
                    min_coins: 0,
                    max_coins: Some(10),
                    cost: 0,
                    target: TargetRule::Forbidden,
                    blocked_by: vec![Card::Duke],
                    effect: Effect::Gain(2),
                },
                ActionRule {
                    action: Action::Coup,
                    min_coins: 7,
                    max_coins: None,
                    cost: 7,
                    target: TargetRule::Required,
                    blocked_by: vec![],
                    effect: Effect::Kill,
                },
                ActionRule {
                    action: Action::Claim(Card::Duke),
                    min_coins: 0,
                    max_coins: Some(10),
                    cost: 0,
                    target: TargetRule::Forbidden,
                    blocked_by: vec![],
                    effect: Effect::Gain(3),
                },
                ActionRule {
                    action: Action::Claim(Card::Captain),
                    min_coins: 0,
                    max_coins: Some(10),
                    cost: 0,
                    target: TargetRule::Required,
                    blocked_by: vec![Card::Captain, Card::Ambassador],
                    effect: Effect::Steal(2),
                },
                ActionRule {
                    action: Action::Claim(Card::Assassin),
                    min_coins: 3,
                    max_coins: Some(10),
                    cost: 3,
                    target: TargetRule::Required,
                    blocked_by: vec![Card::Contessa],
                    effect: Effect::Kill,
                },
                ActionRule {
                    action: Action::Claim(Card::Ambassador),
                    min_coins: 0,
                    max_coins: None,
                    cost: 0,
                    target: TargetRule::Forbidden,
                    blocked_by: vec![],
                    effect: Effect::Exchange(2),
                },
            ],
        }
    }

    /// The Inquisitor variant: the Inquisitor replaces the Ambassador,
    /// blocks stealing, and may either exchange one card or inspect a
    /// targeted opponent's card.
    pub fn inquisitor() -> Self {
        let mut ruleset = Ruleset::standard();
        ruleset.roles = vec![
            Card::Duke,
            Card::Assassin,
            Card::Captain,
            Card::Inquisitor,
            Card::Contessa,
        ];
        for rule in &mut ruleset.actions {
            if rule.action == Action::Claim(Card::Captain) {
                rule.blocked_by = vec![Card::Captain, Card::Inquisitor];
            }
        }
        ruleset
            .actions
            .retain(|rule| rule.action != Action::Claim(Card::Ambassador));
        ruleset.actions.push(ActionRule {
            action: Action::Claim(Card::Inquisitor),
            min_coins: 0,
            max_coins: None,
            cost: 0,
            target: TargetRule::Optional,
            blocked_by: vec![],
            effect: Effect::ExchangeOrInspect(1),
        });
        ruleset
    }

    pub fn rule_for(&self, action: Action) -> Option<&ActionRule> {
        self.actions.iter().find(|rule| rule.action == action)
    }

    pub fn deck_composition(&self) -> Vec<Card> {
        let mut cards = vec![];
        for &role in &self.roles {
            cards.extend(std::iter::repeat(role).take(self.copies_per_role));
        }
        cards
    }
}
