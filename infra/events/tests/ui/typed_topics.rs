use evebus::{Envelope, EventBus, Handler, Symbol, Topic, WildcardHandler};

#[derive(Debug, Clone, PartialEq)]
struct PlayerEvent {
    player: String,
}

#[derive(Debug, Clone, PartialEq)]
struct ScoreEvent {
    score: u64,
}

const LEVEL_UP: Topic<String> = Topic::new("levelUp");
const LIFE_LOST: Topic<Option<u32>> = Topic::new("lifeLost");
const PLAYER_EVENT: Topic<PlayerEvent> = Topic::new("playerEvent");
const SCORE_EVENT: Topic<ScoreEvent> = Topic::new("scoreEvent");

fn main() {
    let bus = EventBus::new();

    let level_up = Handler::new(|_: &String| {});
    let life_lost = Handler::new(|_: &Option<u32>| {});
    let player_event = Handler::new(|_: &PlayerEvent| {});
    let score_event = Handler::new(|_: &ScoreEvent| -> Result<(), std::io::Error> { Ok(()) });
    let wildcard = WildcardHandler::new(|event: &Envelope<'_>| {
        let _ = event.payload_for(&PLAYER_EVENT).map(|e| e.player.len());
        let _ = event.payload_for(&SCORE_EVENT).map(|e| e.score);
    });

    bus.on(&LEVEL_UP, &level_up);
    bus.on(&LIFE_LOST, &life_lost);
    bus.on(&PLAYER_EVENT, &player_event);
    bus.on(&SCORE_EVENT, &score_event);
    bus.on_wildcard(&wildcard);

    bus.emit(&PLAYER_EVENT, PlayerEvent { player: "John".into() });
    bus.emit(&LEVEL_UP, "level2".into());
    bus.emit_empty(&LIFE_LOST);
    bus.emit(&LIFE_LOST, Some(1));
    bus.emit(&SCORE_EVENT, ScoreEvent { score: 5000 });

    bus.off(&LEVEL_UP, &level_up);
    bus.off(&LIFE_LOST, &life_lost);
    bus.off(&PLAYER_EVENT, &player_event);
    bus.off(&SCORE_EVENT, &score_event);
    bus.off_wildcard(&wildcard);

    let by_symbol: Topic<u8> = Topic::with_key(Symbol::new("tick").into());
    bus.once(&by_symbol, |tick: &u8| assert_eq!(*tick, 1));
    bus.emit(&by_symbol, 1);
}
