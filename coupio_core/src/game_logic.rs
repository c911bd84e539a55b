use std::sync::Arc;

use log::info;
use rand::seq::SliceRandom;
use rand::Rng;

use crate::{
    action::Action,
    card::Card,
    connection::{CallError, Connection},
    events::{InspectChoice, Notice, Reply, Request},
    game::Game,
    pending::{Decision, PendingAction},
    player::PlayerId,
    rules::{ActionRule, Effect, TargetRule},
    utils::VecExtensions,
};

/// Whether a declared action survives its reaction window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TurnOutcome {
    Proceed,
    Blocked,
}

impl Game {
    /// One full turn of the current player: request, validate, resolve
    /// reactions, activate. Every failure mode ends in an elimination and a
    /// normally advancing match, never in a stalled one.
    pub(crate) async fn take_turn(&mut self) {
        self.broadcast_update();

        let actor = self.current_player_id();
        let connection = Arc::clone(&self.player(actor).connection);
        let reply = connection
            .call(Request::Turn, self.config.turn_timeout)
            .await;
        let (action, target) = match reply {
            Ok(Reply::Turn { action, target }) => (action, target),
            _ => {
                self.eliminate(actor, "invalid turn response");
                return;
            }
        };

        if let Err(reason) = self.validate_action(actor, action, target) {
            self.eliminate(actor, &reason);
            return;
        }
        let rule = self
            .config
            .ruleset
            .rule_for(action)
            .cloned()
            .expect("validated actions have a rule");

        info!("match {}: player {} declares {}", self.id, actor, action);
        self.broadcast_except(
            actor,
            &Notice::Declared {
                actor,
                target,
                action,
            },
        );

        let outcome = if rule.reactable() {
            self.collect_reactions(actor, target, &rule).await
        } else {
            TurnOutcome::Proceed
        };

        if outcome == TurnOutcome::Proceed {
            self.activate(actor, target, &rule).await;
        }
    }

    /// Legality of a declaration: known rule, sane target, coins within the
    /// action's window.
    fn validate_action(
        &self,
        actor: PlayerId,
        action: Action,
        target: Option<PlayerId>,
    ) -> Result<(), String> {
        let rule = self
            .config
            .ruleset
            .rule_for(action)
            .ok_or_else(|| format!("{} cannot be declared as a turn action", action))?;

        let coins = self.player(actor).coins;
        if coins < rule.min_coins {
            return Err(format!("not enough coins to declare {}", action));
        }
        if let Some(limit) = rule.max_coins {
            if coins >= limit {
                return Err(format!("too many coins to declare {}", action));
            }
        }
        if let Some(threshold) = self.config.forced_coup_at {
            if coins >= threshold && action != Action::Coup {
                return Err(format!("must declare Coup while holding {}+ coins", threshold));
            }
        }

        match (rule.target, target) {
            (TargetRule::Forbidden, Some(_)) => {
                return Err(format!("{} takes no target", action));
            }
            (TargetRule::Required, None) => {
                return Err(format!("{} requires a target", action));
            }
            (_, Some(chosen)) => {
                if chosen == actor {
                    return Err("cannot target yourself".to_string());
                }
                let alive = self.players.iter().any(|p| p.id == chosen && p.alive);
                if !alive {
                    return Err(format!("invalid target: {}", chosen));
                }
            }
            _ => {}
        }

        Ok(())
    }

    /// Broadcast the declared action to every other living player and wait
    /// for the first decisive challenge or block.
    async fn collect_reactions(
        &mut self,
        actor: PlayerId,
        target: Option<PlayerId>,
        rule: &ActionRule,
    ) -> TurnOutcome {
        let expected = self.reaction_audience(actor);
        let pending = PendingAction::new(expected, rule.challengeable(), rule.blocked_by.clone());
        self.solicit(
            actor,
            Request::Reaction {
                actor,
                target,
                action: rule.action,
            },
            &pending,
        );
        let resolution = pending.resolve(self.config.reaction_timeout).await;
        self.punish(resolution.offenders);

        match resolution.decision {
            None => TurnOutcome::Proceed,
            Some(Decision::Challenge(challenger)) => {
                let claim = rule.claim().expect("only claimed actions are challengeable");
                if self.challenge(challenger, actor, claim).await {
                    TurnOutcome::Proceed
                } else {
                    TurnOutcome::Blocked
                }
            }
            Some(Decision::Block { blocker, claim }) => {
                self.resolve_block(blocker, claim).await
            }
        }
    }

    /// A block claim is itself broadcast once more; only a challenge can
    /// answer it. An upheld block keeps the action suppressed, a punctured
    /// one lets it through.
    async fn resolve_block(&mut self, blocker: PlayerId, claim: Card) -> TurnOutcome {
        info!("match {}: player {} blocks with {}", self.id, blocker, claim);
        self.broadcast_except(blocker, &Notice::Blocked { blocker, claim });

        let expected = self.reaction_audience(blocker);
        let pending = PendingAction::new(expected, true, vec![]);
        self.solicit(blocker, Request::BlockReaction { blocker, claim }, &pending);
        let resolution = pending.resolve(self.config.reaction_timeout).await;
        self.punish(resolution.offenders);

        match resolution.decision {
            None => TurnOutcome::Blocked,
            Some(Decision::Challenge(challenger)) => {
                if self.challenge(challenger, blocker, claim).await {
                    TurnOutcome::Blocked
                } else {
                    TurnOutcome::Proceed
                }
            }
            Some(Decision::Block { .. }) => {
                unreachable!("blocks are rejected while a block is being contested")
            }
        }
    }

    fn reaction_audience(&self, exclude: PlayerId) -> usize {
        self.players
            .iter()
            .filter(|p| p.alive && p.id != exclude)
            .count()
    }

    /// Ask every living player except `exclude`, concurrently and in a
    /// per-broadcast random order, feeding the answers into the response
    /// book.
    fn solicit(&self, exclude: PlayerId, request: Request, pending: &Arc<PendingAction>) {
        let mut recipients: Vec<(PlayerId, Arc<dyn Connection>)> = self
            .players
            .iter()
            .filter(|p| p.alive && p.id != exclude)
            .map(|p| (p.id, Arc::clone(&p.connection)))
            .collect();
        recipients.shuffle(&mut rand::thread_rng());

        let timeout = self.config.reaction_timeout;
        for (responder, connection) in recipients {
            let pending = Arc::clone(pending);
            let request = request.clone();
            tokio::spawn(async move {
                let outcome = connection.call(request, timeout).await;
                pending.submit(responder, outcome);
            });
        }
    }

    fn punish(&mut self, offenders: Vec<(PlayerId, String)>) {
        for (player, reason) in offenders {
            self.eliminate(player, &reason);
        }
    }

    /// Adjudicate a challenge against `accused`'s claim to hold `claim`.
    /// Returns whether the claim was upheld. An upheld claim sends the
    /// challenger through the kill protocol and swaps the proven card for a
    /// fresh draw; a punctured one kills the accused instead.
    pub(crate) async fn challenge(
        &mut self,
        challenger: PlayerId,
        accused: PlayerId,
        claim: Card,
    ) -> bool {
        let upheld = self.player(accused).holds_alive(claim);
        info!(
            "match {}: player {} challenges player {} over {} (upheld: {})",
            self.id, challenger, accused, claim, upheld
        );
        self.broadcast(&Notice::ChallengeResult {
            challenger,
            accused,
            claim,
            upheld,
        });

        if upheld {
            let fresh = self.deck.replace(claim);
            let influence = self
                .player_mut(accused)
                .first_alive_influence_mut(claim)
                .expect("the upheld claim was checked against the hand");
            influence.card = fresh;
            self.broadcast(&Notice::Exchanged { player: accused });
            self.kill(challenger).await;
        } else {
            self.kill(accused).await;
        }
        upheld
    }

    /// Take one influence away from `target`. With more than one left the
    /// target picks; with one (or none) left this is a full elimination.
    pub(crate) async fn kill(&mut self, target: PlayerId) {
        if !self.player(target).alive {
            return;
        }
        if self.player(target).alive_influence_count() <= 1 {
            self.eliminate(target, "lost the last influence");
            return;
        }

        let connection = Arc::clone(&self.player(target).connection);
        let reply = connection
            .call(Request::KillSelection, self.config.choice_timeout)
            .await;
        match reply {
            Ok(Reply::Influence(card)) => {
                match self.player_mut(target).first_alive_influence_mut(card) {
                    Some(influence) => {
                        influence.alive = false;
                        self.broadcast(&Notice::InfluenceLost {
                            player: target,
                            card,
                        });
                    }
                    None => self.eliminate(target, "selected an influence that is not held"),
                }
            }
            _ => self.eliminate(target, "invalid influence selection"),
        }
    }

    /// Remove `target` from play entirely: every influence is revealed dead.
    /// Calling this twice is a no-op the second time.
    pub(crate) fn eliminate(&mut self, target: PlayerId, reason: &str) {
        let player = self.player_mut(target);
        if !player.alive {
            return;
        }
        player.alive = false;
        for influence in &mut player.influences {
            influence.alive = false;
        }
        info!("match {}: player {} eliminated: {}", self.id, target, reason);
        self.broadcast(&Notice::Eliminated {
            player: target,
            reason: reason.to_string(),
        });
    }

    /// Apply a surviving action's effect. Costs are paid here, so a blocked
    /// action never costs anything.
    async fn activate(&mut self, actor: PlayerId, target: Option<PlayerId>, rule: &ActionRule) {
        self.player_mut(actor).coins -= rule.cost;
        match rule.effect {
            Effect::Gain(amount) => {
                self.player_mut(actor).coins += amount;
            }
            Effect::Kill => {
                let target = target.expect("target was validated");
                self.kill(target).await;
            }
            Effect::Steal(amount) => {
                let target = target.expect("target was validated");
                let amount = amount.min(self.player(target).coins);
                self.player_mut(target).coins -= amount;
                self.player_mut(actor).coins += amount;
            }
            Effect::Exchange(draw) => {
                self.swap(actor, draw).await;
            }
            Effect::ExchangeOrInspect(draw) => match target {
                Some(target) => self.inspect(actor, target).await,
                None => self.swap(actor, draw).await,
            },
        }
    }

    /// Exchange with the pool: draw `draw` cards, let the player give back
    /// the same number out of hand-plus-drawn. Whatever happens, the drawn
    /// cards end up back in the pool.
    pub(crate) async fn swap(&mut self, actor: PlayerId, draw: usize) {
        let drawn = self.deck.take(draw);
        let connection = Arc::clone(&self.player(actor).connection);
        let reply = connection
            .call(
                Request::SwapSelection {
                    drawn: drawn.clone(),
                    count: draw,
                },
                self.config.choice_timeout,
            )
            .await;

        let mut union = self.player(actor).alive_cards();
        union.extend(drawn.iter().copied());

        let returned = match reply {
            Ok(Reply::Swap(cards)) => cards,
            Err(CallError::Timeout) => {
                let mut fallback = union.clone();
                fallback.shuffle(&mut rand::thread_rng());
                fallback.truncate(draw);
                fallback
            }
            _ => {
                self.deck.put_back(drawn);
                self.eliminate(actor, "unrecognized swap response");
                return;
            }
        };

        if returned.len() != draw {
            self.deck.put_back(drawn);
            self.eliminate(actor, "invalid number of cards returned");
            return;
        }
        let mut kept = union;
        for card in &returned {
            if kept.remove_first_where(|c| c == card).is_none() {
                self.deck.put_back(drawn);
                self.eliminate(actor, "returned a card that was not offered");
                return;
            }
        }

        let player = self.player_mut(actor);
        let mut kept = kept.into_iter();
        for influence in &mut player.influences {
            if influence.alive {
                influence.card = kept
                    .next()
                    .expect("the union minus the returned set keeps the hand size");
            }
        }
        self.deck.put_back(returned);
        self.broadcast_except(actor, &Notice::Exchanged { player: actor });
    }

    /// Forced reveal: the target shows the actor one living card and the
    /// actor decides whether they keep it or trade it at the pool.
    pub(crate) async fn inspect(&mut self, actor: PlayerId, target: PlayerId) {
        if !self.player(target).alive {
            return;
        }

        let target_connection = Arc::clone(&self.player(target).connection);
        let reply = target_connection
            .call(
                Request::RevealSelection { requester: actor },
                self.config.choice_timeout,
            )
            .await;
        let shown = match reply {
            Ok(Reply::Influence(card)) if self.player(target).holds_alive(card) => card,
            Err(CallError::Timeout) => {
                let cards = self.player(target).alive_cards();
                match cards.choose(&mut rand::thread_rng()) {
                    Some(card) => *card,
                    None => return,
                }
            }
            _ => {
                self.eliminate(target, "invalid reveal selection");
                return;
            }
        };
        self.player(actor).connection.notify(&Notice::Revealed {
            player: target,
            card: shown,
        });

        let actor_connection = Arc::clone(&self.player(actor).connection);
        let reply = actor_connection
            .call(
                Request::InspectDecision { card: shown },
                self.config.choice_timeout,
            )
            .await;
        let choice = match reply {
            Ok(Reply::Inspect(choice)) => choice,
            Err(CallError::Timeout) => {
                if rand::thread_rng().gen() {
                    InspectChoice::Keep
                } else {
                    InspectChoice::Replace
                }
            }
            _ => {
                self.eliminate(actor, "invalid lookup response");
                return;
            }
        };

        if choice == InspectChoice::Replace {
            let fresh = self.deck.replace(shown);
            let influence = self
                .player_mut(target)
                .first_alive_influence_mut(shown)
                .expect("the reveal was checked against the hand");
            influence.card = fresh;
            self.broadcast(&Notice::Exchanged { player: target });
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    use async_trait::async_trait;
    use strum::IntoEnumIterator;

    use crate::{
        action::{Action, Reaction},
        card::Card,
        connection::{CallError, Connection},
        deck::Deck,
        events::{InspectChoice, Notice, Reply, Request},
        game::{Game, GameConfig, Status},
        player::{Influence, PlayerId},
        rules::Ruleset,
        utils::VecExtensions,
    };

    struct ScriptedConnection {
        replies: Mutex<VecDeque<Result<Reply, CallError>>>,
        notices: Mutex<Vec<Notice>>,
    }

    impl ScriptedConnection {
        fn new(replies: Vec<Result<Reply, CallError>>) -> Arc<Self> {
            Arc::new(ScriptedConnection {
                replies: Mutex::new(replies.into()),
                notices: Mutex::new(vec![]),
            })
        }

        fn silent() -> Arc<Self> {
            Self::new(vec![])
        }

        fn notices_matching<F>(&self, predicate: F) -> usize
        where
            F: Fn(&Notice) -> bool,
        {
            self.notices
                .lock()
                .unwrap()
                .iter()
                .filter(|n| predicate(n))
                .count()
        }
    }

    #[async_trait]
    impl Connection for ScriptedConnection {
        async fn call(&self, _request: Request, _timeout: Duration) -> Result<Reply, CallError> {
            self.replies
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or(Err(CallError::Timeout))
        }

        fn notify(&self, notice: &Notice) {
            self.notices.lock().unwrap().push(notice.clone());
        }
    }

    fn turn(action: Action, target: Option<PlayerId>) -> Result<Reply, CallError> {
        Ok(Reply::Turn { action, target })
    }

    fn react(reaction: Reaction) -> Result<Reply, CallError> {
        Ok(Reply::Reaction(reaction))
    }

    fn game_with(
        scripts: Vec<Vec<Result<Reply, CallError>>>,
    ) -> (Game, Vec<Arc<ScriptedConnection>>) {
        game_with_config(scripts, GameConfig::default())
    }

    fn game_with_config(
        scripts: Vec<Vec<Result<Reply, CallError>>>,
        mut config: GameConfig,
    ) -> (Game, Vec<Arc<ScriptedConnection>>) {
        config.turn_timeout = Duration::from_millis(50);
        config.reaction_timeout = Duration::from_millis(50);
        config.choice_timeout = Duration::from_millis(50);
        let mut game = Game::new(7, config);
        let connections: Vec<_> = scripts.into_iter().map(ScriptedConnection::new).collect();
        for (i, connection) in connections.iter().enumerate() {
            let handle: Arc<dyn Connection> = connection.clone();
            game.add_player(format!("p{}", i), handle).unwrap();
        }
        game.status = Status::Running;
        (game, connections)
    }

    fn hand(game: &mut Game, id: PlayerId, cards: [Card; 2]) {
        game.player_mut(id).influences = cards
            .iter()
            .map(|&card| Influence { card, alive: true })
            .collect();
    }

    /// Rebuild the deck as the initial supply minus every dealt card, so the
    /// pool invariant is meaningful in tests that deal hands by hand.
    fn settle_deck(game: &mut Game) {
        let mut cards = game.config.ruleset.deck_composition();
        for player in &game.players {
            for influence in &player.influences {
                assert!(
                    cards.remove_first_where(|c| *c == influence.card).is_some(),
                    "test hand exceeds the supply"
                );
            }
        }
        game.deck = Deck::new(cards);
    }

    fn assert_pool_invariant(game: &Game) {
        for role in Card::iter() {
            let held: usize = game
                .players
                .iter()
                .flat_map(|p| &p.influences)
                .filter(|i| i.card == role)
                .count();
            let expected = if game.config.ruleset.roles.contains(&role) {
                game.config.ruleset.copies_per_role
            } else {
                0
            };
            assert_eq!(
                game.deck.count_of(role) + held,
                expected,
                "supply of {} drifted",
                role
            );
        }
    }

    #[tokio::test]
    async fn coup_should_cost_seven_and_kill_the_selected_influence() {
        let (mut game, _) = game_with(vec![
            vec![turn(Action::Coup, Some(1))],
            vec![Ok(Reply::Influence(Card::Assassin))],
        ]);
        hand(&mut game, 0, [Card::Duke, Card::Captain]);
        hand(&mut game, 1, [Card::Assassin, Card::Contessa]);
        game.player_mut(0).coins = 7;
        settle_deck(&mut game);

        game.take_turn().await;

        assert_eq!(game.player(0).coins, 0);
        assert!(game.player(1).alive);
        assert_eq!(game.player(1).alive_cards(), vec![Card::Contessa]);
        assert_pool_invariant(&game);
    }

    #[tokio::test]
    async fn unchallenged_claim_should_activate() {
        let (mut game, _) = game_with(vec![
            vec![turn(Action::Claim(Card::Duke), None)],
            vec![],
        ]);
        hand(&mut game, 0, [Card::Duke, Card::Assassin]);
        hand(&mut game, 1, [Card::Captain, Card::Contessa]);
        settle_deck(&mut game);

        game.take_turn().await;

        assert_eq!(game.player(0).coins, 5);
        assert_pool_invariant(&game);
    }

    #[tokio::test]
    async fn contessa_block_should_keep_the_assassins_coins() {
        let (mut game, _) = game_with(vec![
            vec![
                turn(Action::Claim(Card::Assassin), Some(1)),
                react(Reaction::Pass),
            ],
            vec![react(Reaction::Block(Card::Contessa))],
        ]);
        hand(&mut game, 0, [Card::Assassin, Card::Duke]);
        hand(&mut game, 1, [Card::Contessa, Card::Captain]);
        game.player_mut(0).coins = 3;
        settle_deck(&mut game);

        game.take_turn().await;

        assert_eq!(game.player(0).coins, 3);
        assert_eq!(game.player(1).alive_influence_count(), 2);
        assert_pool_invariant(&game);
    }

    #[tokio::test]
    async fn failed_claim_should_send_the_actor_through_kill() {
        let (mut game, _) = game_with(vec![
            vec![
                turn(Action::Claim(Card::Captain), Some(1)),
                Ok(Reply::Influence(Card::Duke)),
            ],
            vec![react(Reaction::Pass)],
            vec![react(Reaction::Challenge)],
        ]);
        hand(&mut game, 0, [Card::Duke, Card::Assassin]);
        hand(&mut game, 1, [Card::Captain, Card::Contessa]);
        hand(&mut game, 2, [Card::Contessa, Card::Ambassador]);
        settle_deck(&mut game);

        game.take_turn().await;

        // the steal never ran and the actor paid an influence
        assert_eq!(game.player(0).coins, 2);
        assert_eq!(game.player(1).coins, 2);
        assert_eq!(game.player(0).alive_cards(), vec![Card::Assassin]);
        assert_pool_invariant(&game);
    }

    #[tokio::test]
    async fn upheld_claim_should_replace_the_proven_card() {
        let (mut game, _) = game_with(vec![
            vec![turn(Action::Claim(Card::Duke), None)],
            vec![
                react(Reaction::Challenge),
                Ok(Reply::Influence(Card::Captain)),
            ],
        ]);
        hand(&mut game, 0, [Card::Duke, Card::Assassin]);
        hand(&mut game, 1, [Card::Captain, Card::Captain]);
        settle_deck(&mut game);

        game.take_turn().await;

        // tax went through, the challenger lost a card, the actor kept two
        assert_eq!(game.player(0).coins, 5);
        assert_eq!(game.player(0).alive_influence_count(), 2);
        assert_eq!(game.player(1).alive_cards(), vec![Card::Captain]);
        assert_pool_invariant(&game);
    }

    #[tokio::test]
    async fn short_swap_return_should_eliminate_and_refill_the_pool() {
        let (mut game, connections) = game_with(vec![
            vec![
                turn(Action::Claim(Card::Ambassador), None),
                Ok(Reply::Swap(vec![Card::Duke])),
            ],
            vec![react(Reaction::Pass)],
        ]);
        hand(&mut game, 0, [Card::Duke, Card::Captain]);
        hand(&mut game, 1, [Card::Assassin, Card::Contessa]);
        settle_deck(&mut game);

        game.take_turn().await;

        assert!(!game.player(0).alive);
        assert_eq!(game.player(0).alive_influence_count(), 0);
        assert_eq!(game.deck.remaining(), 11);
        assert_pool_invariant(&game);
        assert_eq!(
            connections[1].notices_matching(|n| matches!(
                n,
                Notice::Eliminated { player: 0, reason } if reason.contains("number of cards")
            )),
            1
        );
    }

    #[tokio::test]
    async fn swap_should_exchange_the_returned_cards() {
        let (mut game, _) = game_with(vec![
            vec![
                turn(Action::Claim(Card::Ambassador), None),
                Ok(Reply::Swap(vec![Card::Duke, Card::Duke])),
            ],
            vec![react(Reaction::Pass)],
        ]);
        hand(&mut game, 0, [Card::Duke, Card::Duke]);
        hand(&mut game, 1, [Card::Assassin, Card::Contessa]);
        settle_deck(&mut game);

        game.take_turn().await;

        assert!(game.player(0).alive);
        assert_eq!(game.player(0).alive_influence_count(), 2);
        assert_eq!(game.deck.remaining(), 11);
        assert_pool_invariant(&game);
    }

    #[tokio::test]
    async fn swap_timeout_should_fall_back_to_a_random_return() {
        let (mut game, _) = game_with(vec![
            vec![turn(Action::Claim(Card::Ambassador), None)],
            vec![react(Reaction::Pass)],
        ]);
        hand(&mut game, 0, [Card::Duke, Card::Captain]);
        hand(&mut game, 1, [Card::Assassin, Card::Contessa]);
        settle_deck(&mut game);

        game.take_turn().await;

        assert!(game.player(0).alive);
        assert_eq!(game.player(0).alive_influence_count(), 2);
        assert_eq!(game.deck.remaining(), 11);
        assert_pool_invariant(&game);
    }

    #[tokio::test]
    async fn kill_timeout_should_eliminate_the_target() {
        let (mut game, _) = game_with(vec![
            vec![turn(Action::Coup, Some(1))],
            vec![],
        ]);
        hand(&mut game, 0, [Card::Duke, Card::Captain]);
        hand(&mut game, 1, [Card::Assassin, Card::Contessa]);
        game.player_mut(0).coins = 7;
        settle_deck(&mut game);

        game.take_turn().await;

        assert!(!game.player(1).alive);
        assert_pool_invariant(&game);
    }

    #[tokio::test]
    async fn kill_with_one_influence_left_should_eliminate_outright() {
        let (mut game, _) = game_with(vec![vec![], vec![]]);
        hand(&mut game, 1, [Card::Assassin, Card::Contessa]);
        game.player_mut(1).influences[1].alive = false;

        game.kill(1).await;

        assert!(!game.player(1).alive);
        assert!(game.player(1).influences.iter().all(|i| !i.alive));
    }

    #[tokio::test]
    async fn eliminate_should_be_idempotent() {
        let (mut game, connections) = game_with(vec![vec![], vec![]]);
        hand(&mut game, 1, [Card::Assassin, Card::Contessa]);

        game.eliminate(1, "first");
        game.eliminate(1, "second");

        assert!(!game.player(1).alive);
        assert_eq!(
            connections[0].notices_matching(|n| matches!(n, Notice::Eliminated { .. })),
            1
        );
    }

    #[tokio::test]
    async fn self_target_should_eliminate_the_actor() {
        let (mut game, _) = game_with(vec![
            vec![turn(Action::Claim(Card::Captain), Some(0))],
            vec![],
        ]);
        hand(&mut game, 0, [Card::Captain, Card::Duke]);
        hand(&mut game, 1, [Card::Assassin, Card::Contessa]);

        game.take_turn().await;

        assert!(!game.player(0).alive);
    }

    #[tokio::test]
    async fn turn_timeout_should_eliminate_the_current_player() {
        let (mut game, _) = game_with(vec![vec![], vec![]]);
        hand(&mut game, 0, [Card::Captain, Card::Duke]);
        hand(&mut game, 1, [Card::Assassin, Card::Contessa]);

        game.take_turn().await;

        assert!(!game.player(0).alive);
    }

    #[tokio::test]
    async fn forced_coup_should_reject_other_actions_when_enabled() {
        let mut config = GameConfig::default();
        config.forced_coup_at = Some(10);
        let (mut game, _) = game_with_config(
            vec![
                vec![turn(Action::Claim(Card::Ambassador), None)],
                vec![],
            ],
            config,
        );
        hand(&mut game, 0, [Card::Ambassador, Card::Duke]);
        hand(&mut game, 1, [Card::Assassin, Card::Contessa]);
        game.player_mut(0).coins = 10;

        game.take_turn().await;

        assert!(!game.player(0).alive);
    }

    #[tokio::test]
    async fn steal_should_transfer_at_most_what_the_target_has() {
        let (mut game, _) = game_with(vec![
            vec![turn(Action::Claim(Card::Captain), Some(1))],
            vec![react(Reaction::Pass)],
        ]);
        hand(&mut game, 0, [Card::Captain, Card::Duke]);
        hand(&mut game, 1, [Card::Assassin, Card::Contessa]);
        game.player_mut(1).coins = 1;

        game.take_turn().await;

        assert_eq!(game.player(0).coins, 3);
        assert_eq!(game.player(1).coins, 0);
    }

    #[tokio::test]
    async fn illegal_block_role_should_eliminate_the_reactor() {
        let (mut game, _) = game_with(vec![
            vec![turn(Action::Claim(Card::Duke), None)],
            vec![react(Reaction::Block(Card::Contessa))],
        ]);
        hand(&mut game, 0, [Card::Duke, Card::Assassin]);
        hand(&mut game, 1, [Card::Contessa, Card::Captain]);

        game.take_turn().await;

        // the reactor is gone and the tax still went through
        assert!(!game.player(1).alive);
        assert_eq!(game.player(0).coins, 5);
    }

    #[tokio::test]
    async fn punctured_block_should_let_the_action_through() {
        let (mut game, _) = game_with(vec![
            vec![
                turn(Action::Claim(Card::Captain), Some(1)),
                react(Reaction::Challenge),
            ],
            vec![
                react(Reaction::Block(Card::Ambassador)),
                Ok(Reply::Influence(Card::Duke)),
            ],
            vec![react(Reaction::Pass), react(Reaction::Pass)],
        ]);
        hand(&mut game, 0, [Card::Captain, Card::Duke]);
        hand(&mut game, 1, [Card::Duke, Card::Duke]);
        hand(&mut game, 2, [Card::Contessa, Card::Assassin]);
        settle_deck(&mut game);

        game.take_turn().await;

        assert_eq!(game.player(0).coins, 4);
        assert_eq!(game.player(1).coins, 0);
        assert_eq!(game.player(1).alive_influence_count(), 1);
        assert_pool_invariant(&game);
    }

    #[tokio::test]
    async fn upheld_block_should_keep_the_action_suppressed() {
        let (mut game, _) = game_with(vec![
            vec![
                turn(Action::Claim(Card::Captain), Some(1)),
                react(Reaction::Challenge),
                Ok(Reply::Influence(Card::Duke)),
            ],
            vec![react(Reaction::Block(Card::Captain))],
        ]);
        hand(&mut game, 0, [Card::Captain, Card::Duke]);
        hand(&mut game, 1, [Card::Captain, Card::Contessa]);
        settle_deck(&mut game);

        game.take_turn().await;

        // no coins moved; the failed challenger paid an influence instead
        assert_eq!(game.player(0).coins, 2);
        assert_eq!(game.player(1).coins, 2);
        assert_eq!(game.player(0).alive_influence_count(), 1);
        assert_eq!(game.player(1).alive_influence_count(), 2);
        assert_pool_invariant(&game);
    }

    #[tokio::test]
    async fn inspect_keep_should_leave_the_hand_alone() {
        let mut config = GameConfig::default();
        config.ruleset = Ruleset::inquisitor();
        let (mut game, connections) = game_with_config(
            vec![
                vec![
                    turn(Action::Claim(Card::Inquisitor), Some(1)),
                    Ok(Reply::Inspect(InspectChoice::Keep)),
                ],
                vec![
                    react(Reaction::Pass),
                    Ok(Reply::Influence(Card::Contessa)),
                ],
            ],
            config,
        );
        hand(&mut game, 0, [Card::Inquisitor, Card::Duke]);
        hand(&mut game, 1, [Card::Contessa, Card::Assassin]);
        settle_deck(&mut game);

        game.take_turn().await;

        assert!(game.player(1).holds_alive(Card::Contessa));
        assert_eq!(
            connections[0].notices_matching(|n| matches!(
                n,
                Notice::Revealed {
                    player: 1,
                    card: Card::Contessa
                }
            )),
            1
        );
        assert_pool_invariant(&game);
    }

    #[tokio::test]
    async fn inspect_replace_should_trade_the_card_at_the_pool() {
        let mut config = GameConfig::default();
        config.ruleset = Ruleset::inquisitor();
        let (mut game, _) = game_with_config(
            vec![
                vec![
                    turn(Action::Claim(Card::Inquisitor), Some(1)),
                    Ok(Reply::Inspect(InspectChoice::Replace)),
                ],
                vec![
                    react(Reaction::Pass),
                    Ok(Reply::Influence(Card::Contessa)),
                ],
            ],
            config,
        );
        hand(&mut game, 0, [Card::Inquisitor, Card::Duke]);
        hand(&mut game, 1, [Card::Contessa, Card::Assassin]);
        settle_deck(&mut game);

        game.take_turn().await;

        assert_eq!(game.player(1).alive_influence_count(), 2);
        assert_pool_invariant(&game);
    }

    #[tokio::test]
    async fn inquisitor_without_target_should_exchange_instead() {
        let mut config = GameConfig::default();
        config.ruleset = Ruleset::inquisitor();
        let (mut game, _) = game_with_config(
            vec![
                vec![
                    turn(Action::Claim(Card::Inquisitor), None),
                    Ok(Reply::Swap(vec![Card::Duke])),
                ],
                vec![react(Reaction::Pass)],
            ],
            config,
        );
        hand(&mut game, 0, [Card::Inquisitor, Card::Duke]);
        hand(&mut game, 1, [Card::Contessa, Card::Assassin]);
        settle_deck(&mut game);

        game.take_turn().await;

        assert!(game.player(0).alive);
        assert_eq!(game.player(0).alive_influence_count(), 2);
        assert_pool_invariant(&game);
    }

    #[tokio::test]
    async fn full_match_of_bots_should_finish() {
        use crate::random_bot::RandomBot;

        let mut game = Game::new(11, GameConfig::default());
        for i in 0..4 {
            let bot: Arc<dyn Connection> = Arc::new(RandomBot::new());
            game.add_player(format!("bot{}", i), bot).unwrap();
        }

        let winner = game.run().await;

        assert!(winner.is_some());
        assert_eq!(game.status(), Status::Finished);
        assert_eq!(game.alive_ids().len(), 1);
        assert_pool_invariant(&game);
    }
}
