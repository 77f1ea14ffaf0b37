use std::collections::HashMap;

use log::{debug, info};
use rand::Rng;

use crate::game::entities::{Block, RoundContext};
use crate::game::grid::{GenerateError, Map, allocate_kings};
use crate::game::mode::Rules;
use crate::game::systems::{
    FogMemory, MoveCommand, MoveError, MoveOutcome, MoveResolver, Participant, PlayerSight, apply_king_capture,
    decide_winner, surrender_territory,
};
use crate::game::types::{PlayerId, TeamId};

/// The authoritative simulation of one running game.
///
/// Owns the true map; every outbound view is projected from it through
/// [`GameState::view_for`].
#[derive(Debug, Clone)]
pub struct GameState {
    map: Map,
    rules: Rules,
    turn: u32,
    participants: Vec<Participant>,
    fog: FogMemory,
    current_player: Option<PlayerId>,
    /// Moves accepted from each player during the current round.
    moves_used: HashMap<PlayerId, u16>,
    /// `Some` once the game is decided; the inner value is the winning team.
    outcome: Option<Option<TeamId>>,
}

impl GameState {
    pub fn new(map: Map, rules: Rules, participants: Vec<Participant>) -> Self {
        let current_player = if rules.turn_priority {
            participants.iter().find(|p| p.alive).map(|p| p.id)
        } else {
            None
        };
        // a roster of one team has nobody to fight
        let outcome = decide_winner(&participants);
        if let Some(winner) = outcome {
            info!("[Game] decided at start, winning team {:?}", winner);
        }
        Self {
            map,
            rules,
            turn: 1,
            participants,
            fog: FogMemory::new(),
            current_player,
            moves_used: HashMap::new(),
            outcome,
        }
    }

    /// Hand out kings on `map` to `roster` (player, team) and start at turn 1.
    pub fn start<R: Rng>(
        mut map: Map,
        rules: Rules,
        roster: &[(PlayerId, TeamId)],
        rng: &mut R,
    ) -> Result<Self, GenerateError> {
        let ids: Vec<PlayerId> = roster.iter().map(|(id, _)| *id).collect();
        allocate_kings(&mut map, &ids, rng)?;
        let participants = roster.iter().map(|&(id, team)| Participant { id, team, alive: true }).collect();
        Ok(Self::new(map, rules, participants))
    }

    pub fn map(&self) -> &Map {
        &self.map
    }

    pub fn rules(&self) -> &Rules {
        &self.rules
    }

    pub fn turn(&self) -> u32 {
        self.turn
    }

    pub fn current_player(&self) -> Option<PlayerId> {
        self.current_player
    }

    pub fn participants(&self) -> &[Participant] {
        &self.participants
    }

    pub fn participant(&self, id: PlayerId) -> Option<&Participant> {
        self.participants.iter().find(|p| p.id == id)
    }

    pub fn is_alive(&self, id: PlayerId) -> bool {
        self.participant(id).is_some_and(|p| p.alive)
    }

    pub fn is_over(&self) -> bool {
        self.outcome.is_some()
    }

    /// Winning team, once decided. `None` while running or after a draw.
    pub fn winner(&self) -> Option<TeamId> {
        self.outcome.flatten()
    }

    /// Validate and apply a move, then settle any elimination it caused.
    pub fn apply_move(&mut self, cmd: &MoveCommand) -> Result<MoveOutcome, MoveError> {
        match self.participant(cmd.player_id) {
            None => return Err(MoveError::NotParticipant(cmd.player_id)),
            Some(p) if !p.alive => return Err(MoveError::Eliminated(cmd.player_id)),
            Some(_) => {}
        }
        let used = self.moves_used.get(&cmd.player_id).copied().unwrap_or(0);
        if self.rules.moves_per_turn > 0 && used >= self.rules.moves_per_turn {
            return Err(MoveError::NoMovesLeft(cmd.player_id));
        }
        let outcome = MoveResolver::apply(&mut self.map, &self.rules, cmd)?;
        self.moves_used.insert(cmd.player_id, used.saturating_add(1));
        if let Some(loser) = outcome.king_captured {
            let moved = apply_king_capture(&mut self.map, loser, cmd.player_id, self.rules.capture_transfer);
            info!("[Game] player={} captured the king of player={} ({} tiles transferred)", cmd.player_id, loser, moved);
            self.eliminate(loser);
        }
        Ok(outcome)
    }

    /// Take `player` out of the game; their territory turns neutral at once.
    pub fn surrender(&mut self, player: PlayerId) -> Result<(), MoveError> {
        match self.participant(player) {
            None => return Err(MoveError::NotParticipant(player)),
            Some(p) if !p.alive => return Err(MoveError::Eliminated(player)),
            Some(_) => {}
        }
        let released = surrender_territory(&mut self.map, player);
        info!("[Game] player={} surrendered, {} tiles released", player, released);
        self.eliminate(player);
        Ok(())
    }

    /// Close the round: end-of-round cleanup, turn counter, production.
    pub fn next_turn(&mut self) {
        let finished = RoundContext { round: self.turn, rules: &self.rules, producer: self.current_player };
        self.map.round_end(&finished);

        self.turn += 1;
        self.moves_used.clear();
        if self.rules.turn_priority {
            self.current_player = self.next_live_after(self.current_player);
        }
        let next = RoundContext { round: self.turn, rules: &self.rules, producer: self.current_player };
        self.map.round_start(&next);
        debug!("[Game] turn={} current_player={:?}", self.turn, self.current_player);
    }

    /// End the game without a winner.
    pub fn abort(&mut self) {
        if self.outcome.is_none() {
            self.outcome = Some(None);
        }
    }

    /// What `viewer` is allowed to see right now. Updates their fog memory.
    pub fn sight_for(&mut self, viewer: PlayerId) -> PlayerSight {
        let team = match self.participant(viewer) {
            Some(p) if p.alive && !self.is_over() => p.team,
            _ => return PlayerSight::everything(self.map.size()),
        };
        let owners: Vec<PlayerId> = self.participants.iter().filter(|p| p.team == team).map(|p| p.id).collect();
        self.fog.observe(&self.map, viewer, &owners, &self.rules)
    }

    /// The fogged map as `viewer` sees it.
    pub fn view_for(&mut self, viewer: PlayerId) -> Vec<Vec<Block>> {
        let sight = self.sight_for(viewer);
        self.map.fog_view(&sight)
    }

    /// The fogged map for each of `viewers`, in the same order.
    pub fn views_for(&mut self, viewers: &[PlayerId]) -> Vec<Vec<Vec<Block>>> {
        let sights: Vec<PlayerSight> = viewers.iter().map(|&id| self.sight_for(id)).collect();
        self.map.fog(&sights)
    }

    fn eliminate(&mut self, player: PlayerId) {
        if let Some(p) = self.participants.iter_mut().find(|p| p.id == player) {
            p.alive = false;
        }
        if self.current_player == Some(player) {
            self.current_player = self.next_live_after(Some(player));
        }
        if self.outcome.is_none() {
            self.outcome = decide_winner(&self.participants);
            if let Some(winner) = self.outcome {
                info!("[Game] decided at turn={}, winning team {:?}", self.turn, winner);
            }
        }
    }

    /// Next live participant after `current` in roster order, wrapping around.
    fn next_live_after(&self, current: Option<PlayerId>) -> Option<PlayerId> {
        let start = current
            .and_then(|id| self.participants.iter().position(|p| p.id == id))
            .map_or(0, |i| i + 1);
        let n = self.participants.len();
        (0..n).map(|k| &self.participants[(start + k) % n]).find(|p| p.alive).map(|p| p.id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::entities::BlockKind;
    use crate::game::mode::CaptureTransfer;
    use crate::game::types::{Direction, MapInfo, MapSize, NEUTRAL, Position};
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    /// 5x1 strip: king 1 at (1,1), king 2 at (3,1), soldier of 2 at (5,1).
    fn duel(rules: Rules) -> GameState {
        let mut map = Map::filled(MapSize::new(5, 1), MapInfo::default(), Block::blank());
        map.set_block(Position::new(1, 1), Block::king(1, 10)).unwrap();
        map.set_block(Position::new(2, 1), Block::soldier(1, 1)).unwrap();
        map.set_block(Position::new(3, 1), Block::king(2, 2)).unwrap();
        map.set_block(Position::new(5, 1), Block::soldier(2, 6)).unwrap();
        let participants = vec![
            Participant { id: 1, team: 1, alive: true },
            Participant { id: 2, team: 2, alive: true },
        ];
        GameState::new(map, rules, participants)
    }

    fn step(player: PlayerId, x: u16, direction: Direction, troops: u16) -> MoveCommand {
        MoveCommand { player_id: player, from: Position::new(x, 1), direction, troops }
    }

    #[test]
    fn king_capture_ends_the_game() {
        let mut game = duel(Rules::default());
        game.apply_move(&step(1, 1, Direction::Right, 9)).unwrap();
        game.apply_move(&step(1, 2, Direction::Right, 9)).unwrap();

        assert!(game.is_over());
        assert_eq!(game.winner(), Some(1));
        assert!(!game.is_alive(2));
        assert_eq!(game.map().block(Position::new(3, 1)).unwrap(), Block::castle(1, 7));
        assert_eq!(game.map().block(Position::new(5, 1)).unwrap(), Block::soldier(1, 6));
    }

    #[test]
    fn neutral_cascade_releases_tiles() {
        let rules = Rules { capture_transfer: CaptureTransfer::Neutral, ..Rules::default() };
        let mut game = duel(rules);
        game.apply_move(&step(1, 1, Direction::Right, 9)).unwrap();
        game.apply_move(&step(1, 2, Direction::Right, 9)).unwrap();
        assert_eq!(game.map().block(Position::new(5, 1)).unwrap(), Block::soldier(NEUTRAL, 6));
    }

    #[test]
    fn outsiders_and_losers_cannot_move() {
        let mut game = duel(Rules::default());
        assert_eq!(game.apply_move(&step(9, 1, Direction::Right, 1)), Err(MoveError::NotParticipant(9)));
        game.surrender(2).unwrap();
        assert_eq!(game.apply_move(&step(2, 5, Direction::Left, 1)), Err(MoveError::Eliminated(2)));
        assert_eq!(game.surrender(2), Err(MoveError::Eliminated(2)));
    }

    #[test]
    fn surrender_neutralises_and_decides() {
        let mut game = duel(Rules::default());
        game.surrender(1).unwrap();
        assert_eq!(game.winner(), Some(2));
        assert!(game.map().owned_by(1).is_empty());
        assert_eq!(game.map().block(Position::new(1, 1)).unwrap(), Block::castle(NEUTRAL, 10));
    }

    #[test]
    fn next_turn_produces_on_buildings() {
        let mut game = duel(Rules::default());
        game.next_turn();
        assert_eq!(game.turn(), 2);
        assert_eq!(game.map().block(Position::new(1, 1)).unwrap().num(), 11);
        assert_eq!(game.map().block(Position::new(2, 1)).unwrap().num(), 1);
    }

    #[test]
    fn soldiers_grow_on_their_interval() {
        let mut game = duel(Rules { soldier_growth_interval: 2, ..Rules::default() });
        game.next_turn();
        assert_eq!(game.map().block(Position::new(5, 1)).unwrap().num(), 7);
        game.next_turn();
        assert_eq!(game.map().block(Position::new(5, 1)).unwrap().num(), 7);
    }

    #[test]
    fn priority_rotates_and_gates_production() {
        let mut game = duel(Rules { turn_priority: true, ..Rules::default() });
        assert_eq!(game.current_player(), Some(1));
        game.next_turn();
        assert_eq!(game.current_player(), Some(2));
        assert_eq!(game.map().block(Position::new(1, 1)).unwrap().num(), 10);
        assert_eq!(game.map().block(Position::new(3, 1)).unwrap().num(), 3);
        game.next_turn();
        assert_eq!(game.current_player(), Some(1));
        assert_eq!(game.map().block(Position::new(1, 1)).unwrap().num(), 11);
    }

    #[test]
    fn views_are_fogged_until_the_game_ends() {
        let mut game = duel(Rules::default());
        let view = game.view_for(1);
        assert_eq!(view[0][0], Block::king(1, 10));
        assert_eq!(view[0][2], Block::king(2, 2));
        assert_eq!(view[0][4], Block::unknown());

        game.abort();
        assert!(game.is_over());
        assert_eq!(game.winner(), None);
        assert_eq!(game.view_for(1)[0][4], Block::soldier(2, 6));
    }

    #[test]
    fn move_budget_resets_each_round() {
        let mut game = duel(Rules { moves_per_turn: 1, ..Rules::default() });
        game.apply_move(&step(1, 1, Direction::Right, 2)).unwrap();
        assert_eq!(game.apply_move(&step(1, 2, Direction::Left, 1)), Err(MoveError::NoMovesLeft(1)));
        // another player's budget is separate
        game.apply_move(&step(2, 5, Direction::Left, 1)).unwrap();

        game.next_turn();
        game.apply_move(&step(1, 2, Direction::Left, 1)).unwrap();
    }

    #[test]
    fn rejected_moves_do_not_spend_the_budget() {
        let mut game = duel(Rules { moves_per_turn: 1, ..Rules::default() });
        let err = game.apply_move(&step(1, 1, Direction::Right, 50)).unwrap_err();
        assert!(matches!(err, MoveError::InsufficientTroops { .. }));
        game.apply_move(&step(1, 1, Direction::Right, 2)).unwrap();
    }

    #[test]
    fn unlimited_budget_by_default() {
        let mut game = duel(Rules::default());
        for _ in 0..5 {
            game.apply_move(&step(1, 1, Direction::Right, 1)).unwrap();
        }
    }

    #[test]
    fn every_viewer_gets_their_own_fog() {
        let mut game = duel(Rules::default());
        let views = game.views_for(&[1, 2, 9]);
        assert_eq!(views.len(), 3);
        assert_eq!(views[0], game.view_for(1));
        assert_eq!(views[1], game.view_for(2));
        assert_eq!(views[0][0][4], Block::unknown());
        assert_eq!(views[1][0][4], Block::soldier(2, 6));
        // outsiders watch the whole board
        assert_eq!(views[2][0][4], Block::soldier(2, 6));
    }

    #[test]
    fn a_single_team_roster_is_decided_at_once() {
        let map = Map::filled(MapSize::new(3, 1), MapInfo::default(), Block::blank());
        let participants = vec![
            Participant { id: 1, team: 4, alive: true },
            Participant { id: 2, team: 4, alive: true },
        ];
        let game = GameState::new(map, Rules::default(), participants);
        assert!(game.is_over());
        assert_eq!(game.winner(), Some(4));
    }

    #[test]
    fn start_hands_out_kings() {
        let mut map = Map::filled(MapSize::new(6, 6), MapInfo::default(), Block::blank());
        map.set_block(Position::new(1, 1), Block::king(NEUTRAL, 0)).unwrap();
        let mut rng = StdRng::seed_from_u64(9);
        let game = GameState::start(map, Rules::default(), &[(4, 1), (7, 2)], &mut rng).unwrap();
        assert_eq!(game.map().positions_of(BlockKind::King).len(), 2);
        assert_eq!(game.map().owned_by(4).len(), 1);
        assert_eq!(game.map().owned_by(7).len(), 1);
        assert_eq!(game.turn(), 1);
    }

    #[test]
    fn templates_lose_tiles_of_absent_players() {
        let mut map = Map::filled(MapSize::new(4, 1), MapInfo::default(), Block::blank());
        map.set_block(Position::new(1, 1), Block::king(NEUTRAL, 0)).unwrap();
        map.set_block(Position::new(4, 1), Block::king(NEUTRAL, 0)).unwrap();
        map.set_block(Position::new(2, 1), Block::castle(8, 20)).unwrap();
        let mut rng = StdRng::seed_from_u64(1);
        let mut game = GameState::start(map, Rules::default(), &[(1, 1), (2, 2)], &mut rng).unwrap();
        game.next_turn();
        assert_eq!(game.map().block(Position::new(2, 1)).unwrap(), Block::castle(NEUTRAL, 20));
    }
}
