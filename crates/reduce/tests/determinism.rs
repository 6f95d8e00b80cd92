#![forbid(unsafe_code)]

use demosum_core::{DemoHeader, DomainEvent, GameEvent, PlayerDeath, PlayerEntity, PlayerTeam, UserInfo, Xuid};
use demosum_reduce::script::ScriptedSource;
use demosum_reduce::{reduce, ReduceConfig};

fn player(userid: i32, account: i32, pos: [f32; 3]) -> PlayerEntity {
    PlayerEntity { userid, xuid: Xuid::new(account, 1), name: format!("p{userid}"), fakeplayer: false, team: 0, position: pos }
}

/// A short two-half match with a reconnect, a bot and some noise.
fn script() -> ScriptedSource {
    let mut bot = player(20, 0, [0.0; 3]);
    bot.fakeplayer = true;
    let mut s = ScriptedSource::new()
        .start(DemoHeader { mapname: "de_nuke".into(), tickrate: 128.0, protocol: 13 })
        .convar("mp_maxrounds", "2")
        .player(bot)
        .event(demosum_core::SourceEvent::StringTableUpdate {
            table: "userinfo".into(),
            user_data: Some(UserInfo { xuid: Xuid::default(), name: "BOT".into(), userid: 20, fakeplayer: true }),
        });
    for (id, acct) in [(1, 100), (2, 200), (3, 300), (4, 400)] {
        s = s
            .player(player(id, acct, [id as f32 * 10.5, -(id as f32) * 3.3, 1.0]))
            .userinfo(UserInfo { xuid: Xuid::new(acct, 1), name: format!("p{id}"), userid: id, fakeplayer: false });
    }
    s = s
        .team(2, 0, &[1, 2])
        .team(3, 0, &[3, 4])
        .game(GameEvent::PlayerTeam(PlayerTeam { userid: 20, team: 2, oldteam: 0, disconnect: false, isbot: true }))
        .game(GameEvent::RoundAnnounceMatchStart);
    for half in 0..2 {
        let (a, b) = if half == 0 { (2u8, 3u8) } else { (3, 2) };
        s = s.team(a, half, &[1, 2]).team(b, 0, &[3, 4]);
        if half == 1 {
            // player 2 reconnects with a fresh userid
            s = s.remove_player(2).player(player(12, 200, [5.0; 3])).team(a, half, &[1, 12]);
        }
        s = s
            .rounds_played(half)
            .tick(1000 * (half + 1))
            .game(GameEvent::RoundStart)
            .game(GameEvent::PlayerDeath(PlayerDeath { userid: 3, attacker: 1, weapon: "m4a1".into() }))
            .game(GameEvent::PlayerDeath(PlayerDeath { userid: 4, attacker: 0, weapon: "world".into() }));
        if half == 0 {
            s = s.game(GameEvent::RoundAnnounceLastRoundHalf);
        } else {
            s = s.game(GameEvent::RoundAnnounceMatchPoint);
        }
        s = s.game(GameEvent::RoundEnd).game(GameEvent::RoundOfficiallyEnded);
    }
    s.team(3, 1, &[1, 12]).team(2, 1, &[3, 4]).end()
}

#[test]
fn identical_streams_serialize_identically() {
    let a = reduce(&mut script(), ReduceConfig::default()).unwrap().to_json().unwrap();
    let b = reduce(&mut script(), ReduceConfig::default()).unwrap().to_json().unwrap();
    assert_eq!(a, b);
}

#[test]
fn two_half_match_invariants() {
    let rec = reduce(&mut script(), ReduceConfig::default()).unwrap();

    assert_eq!(rec.identities.len(), 4);
    assert!(rec.identities.iter().all(|i| i.userid != 20));

    // roster order is team slot 2 then 3; after the swap player 2 reappears under its new id
    let assigns: Vec<_> = rec
        .events
        .iter()
        .filter_map(|e| match e {
            DomainEvent::TeamAssign { userid, team } => Some((*userid, *team)),
            _ => None,
        })
        .collect();
    assert_eq!(assigns, vec![(1, 2), (2, 2), (3, 3), (4, 3), (3, 2), (4, 2), (1, 3), (12, 3)]);

    for e in &rec.events {
        if let DomainEvent::Kill { attacker, victim, .. } = e {
            assert_ne!(attacker, victim);
            assert_ne!(*attacker, 0);
        }
    }
    let kills = rec.events.iter().filter(|e| matches!(e, DomainEvent::Kill { .. })).count();
    assert_eq!(kills, 2);
    assert_eq!(rec.score, [1, 1]);
    assert_eq!(rec.convars["mp_maxrounds"], "2");
}
