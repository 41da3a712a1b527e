//! One poll-fetch-write pass: select newly scheduled races, insert their sheet
//! rows, confirm them in the seen-set, then re-sort the schedule window.

use {
    std::collections::BTreeSet,
    crate::{
        league::{
            self,
            Race,
            RaceState,
        },
        prelude::*,
        seen::{
            self,
            SeenRaces,
        },
        sheets,
        time,
    },
};

#[derive(Debug, thiserror::Error)]
pub(crate) enum Error {
    #[error(transparent)] League(#[from] league::Error),
    #[error(transparent)] Seen(#[from] seen::Error),
    #[error(transparent)] Sheets(#[from] sheets::Error),
}

/// Filters the fetched race list down to races that still need a sheet row:
/// unseen, still in the `Scheduled` state, and starting at or after `now`. Races
/// with no start time are excluded. Sorted ascending by id so multiple new races
/// are written in a deterministic order.
pub(crate) fn select_new_races(races: &[Race], seen: &SeenRaces, now: DateTime<Utc>) -> Vec<Race> {
    let mut new_races = races.iter()
        .filter(|race| !seen.contains(race.id))
        .filter(|race| race.state == RaceState::Scheduled)
        .filter(|race| race.scheduled_for.is_some_and(|start| start >= now))
        .cloned()
        .collect::<Vec<_>>();
    new_races.sort_by_key(|race| race.id);
    new_races
}

fn player_name(players: &HashMap<u64, String>, id: u64) -> String {
    players.get(&id).cloned().unwrap_or_else(|| format!("Player {id}"))
}

fn bracket_name(brackets: &HashMap<u64, String>, id: u64) -> String {
    brackets.get(&id).cloned().unwrap_or_else(|| format!("Bracket {id}"))
}

/// Builds the 17-column row (A–Q) for a race.
///
/// Columns B–D are formulas the sheet evaluates against the freshly inserted
/// row; which offset formula column C gets depends on whether the race starts
/// during US Eastern DST. Unresolved player or bracket ids render as placeholder
/// names rather than failing the cycle.
pub(crate) fn build_row(config: &Config, race: &Race, start: DateTime<Utc>, players: &HashMap<u64, String>, brackets: &HashMap<u64, String>) -> Vec<String> {
    let row = config.insert_row;
    let dst_formula = if time::is_us_eastern_dst(start) {
        &config.dst_formula_dst
    } else {
        &config.dst_formula_standard
    };
    let title = format!(
        "{}: {} - {} vs. {}",
        config.event_name,
        bracket_name(brackets, race.bracket_id),
        player_name(players, race.player1_id),
        player_name(players, race.player2_id),
    );
    let mut values = vec![
        start.format("%m/%d/%Y %H:%M:%S").to_string(),
        format!("=IF(A{row}=\"\",\"\",TEXT(A{row},\"ddd\"))"),
        dst_formula.replace("{row}", &row.to_string()),
        format!("=IF(C{row}=\"\",\"\",TEXT(C{row},\"ddd\"))"),
        title,
        config.run_estimate.clone(),
        config.runner_count.to_string(),
    ];
    values.resize(sheets::ROW_WIDTH as usize, String::new());
    values
}

/// Runs one full cycle. Any error aborts the rest of the cycle; races not yet
/// confirmed in the seen-set are naturally retried on the next interval.
pub(crate) async fn run_cycle(http_client: &reqwest::Client, config: &Config, seen: &mut SeenRaces) -> Result<(), Error> {
    let races = league::scheduled_races(http_client, config).await?;
    let new_races = select_new_races(&races, seen, Utc::now());
    if new_races.is_empty() { return Ok(()) }
    let worksheet_id = sheets::worksheet_id(http_client, &config.sheet_id, &config.worksheet_name).await?;
    let player_ids = new_races.iter()
        .flat_map(|race| [race.player1_id, race.player2_id])
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect::<Vec<_>>();
    // Unrelated reads, so they can run concurrently.
    let (players, brackets) = tokio::try_join!(
        league::players(http_client, config, &player_ids),
        league::brackets(http_client, config),
    )?;
    let players = players.into_iter().map(|player| (player.id, player.name)).collect::<HashMap<_, _>>();
    let brackets = brackets.into_iter().map(|bracket| (bracket.id, bracket.name)).collect::<HashMap<_, _>>();
    for race in &new_races {
        // selection guarantees a start time
        let Some(start) = race.scheduled_for else { continue };
        let values = build_row(config, race, start, &players, &brackets);
        // Each insert shifts rows below the target down, so the write into the
        // fixed insert position must complete before the next insert.
        sheets::insert_blank_row(http_client, &config.sheet_id, worksheet_id, config.insert_row).await?;
        let range = format!("'{}'!A{}:Q{}", config.worksheet_name, config.insert_row, config.insert_row);
        sheets::update_values(http_client, &config.sheet_id, &range, vec![values]).await?;
        // Only confirmed writes enter the seen-set, write-through.
        seen.add(race.id).await?;
        log::info!("exported race {} starting {}", race.id, start.format("%Y-%m-%d %H:%M:%S"));
    }
    sheets::sort_rows(http_client, &config.sheet_id, worksheet_id, config.insert_row).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn race(id: u64, state: RaceState, scheduled_for: Option<DateTime<Utc>>) -> Race {
        Race {
            id,
            state,
            player1_id: 10,
            player2_id: 11,
            bracket_id: 7,
            scheduled_for,
        }
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).single().unwrap()
    }

    #[test]
    fn selection_skips_seen_past_foreign_state_and_unscheduled() {
        let seen = SeenRaces::from_ids([1, 2]);
        let future = now() + chrono::TimeDelta::hours(2);
        let past = now() - chrono::TimeDelta::hours(2);
        let races = vec![
            race(1, RaceState::Scheduled, Some(future)),
            race(3, RaceState::Scheduled, Some(future)),
            race(4, RaceState::Scheduled, Some(past)),
            race(5, RaceState::Other, Some(future)),
            race(6, RaceState::Scheduled, None),
        ];
        let selected = select_new_races(&races, &seen, now());
        assert_eq!(selected.iter().map(|race| race.id).collect::<Vec<_>>(), [3]);
    }

    #[test]
    fn selection_orders_ascending_by_id() {
        let seen = SeenRaces::from_ids([]);
        let future = now() + chrono::TimeDelta::hours(2);
        let races = vec![
            race(9, RaceState::Scheduled, Some(future)),
            race(3, RaceState::Scheduled, Some(future)),
            race(7, RaceState::Scheduled, Some(future)),
        ];
        let selected = select_new_races(&races, &seen, now());
        assert_eq!(selected.iter().map(|race| race.id).collect::<Vec<_>>(), [3, 7, 9]);
    }

    #[test]
    fn start_exactly_at_now_is_still_eligible() {
        let seen = SeenRaces::from_ids([]);
        let races = vec![race(3, RaceState::Scheduled, Some(now()))];
        assert_eq!(select_new_races(&races, &seen, now()).len(), 1);
    }

    #[test]
    fn rerun_with_unchanged_inputs_selects_nothing() {
        let future = now() + chrono::TimeDelta::hours(2);
        let races = vec![race(3, RaceState::Scheduled, Some(future))];
        // after the first cycle confirmed race 3, the same upstream list yields nothing
        let seen = SeenRaces::from_ids([3]);
        assert!(select_new_races(&races, &seen, now()).is_empty());
    }

    #[test]
    fn row_is_seventeen_columns_with_blank_tail() {
        let config = Config::test_default();
        let start = now();
        let values = build_row(&config, &race(3, RaceState::Scheduled, Some(start)), start, &HashMap::default(), &HashMap::default());
        assert_eq!(values.len(), sheets::ROW_WIDTH as usize);
        assert!(values[7..].iter().all(|value| value.is_empty()));
    }

    #[test]
    fn unresolved_ids_render_as_placeholders() {
        let config = Config::test_default();
        let start = now();
        let mut race = race(3, RaceState::Scheduled, Some(start));
        race.player1_id = 42;
        let mut players = HashMap::default();
        players.insert(11, "Bob".to_owned());
        let values = build_row(&config, &race, start, &players, &HashMap::default());
        assert_eq!(values[4], "Test League: Bracket 7 - Player 42 vs. Bob");
    }

    #[test]
    fn formulas_reference_the_insert_row() {
        let config = Config::test_default();
        let start = Utc.with_ymd_and_hms(2024, 1, 15, 18, 30, 0).single().unwrap();
        let values = build_row(&config, &race(3, RaceState::Scheduled, Some(start)), start, &HashMap::default(), &HashMap::default());
        assert_eq!(values[0], "01/15/2024 18:30:00");
        assert_eq!(values[1], "=IF(A4=\"\",\"\",TEXT(A4,\"ddd\"))");
        assert_eq!(values[2], "=A4-ESTOffset");
        assert_eq!(values[3], "=IF(C4=\"\",\"\",TEXT(C4,\"ddd\"))");
        assert_eq!(values[5], "1:30:00");
        assert_eq!(values[6], "2");
    }

    #[test]
    fn summer_races_use_the_daylight_offset_formula() {
        let config = Config::test_default();
        let start = Utc.with_ymd_and_hms(2024, 7, 4, 18, 30, 0).single().unwrap();
        let values = build_row(&config, &race(3, RaceState::Scheduled, Some(start)), start, &HashMap::default(), &HashMap::default());
        assert_eq!(values[2], "=A4-EDTOffset");
    }
}
