use std::collections::HashSet;
use std::io::Write;

use anyhow::{bail, Context, Result};

use studyquest_lib::flashcards::Card;
use studyquest_lib::session::{
    GradeOutcome, GradeSignal, Response, RevealResult, SprintSnapshot, Transition,
};
use studyquest_lib::techniques::{CardOrder, CollectingMode, GradingMode, TechniqueId, TechniqueProfile};
use studyquest_lib::xp::{find_character, XpAward};
use studyquest_lib::{CompletionReport, SessionHandle, StudyEngine};

use crate::app::App;
use crate::render::terminal::{
    paint, render_answer, render_question, render_rating_prompt, render_report, render_requeue,
    render_timer, Color,
};
use crate::OutputFormat;

pub struct StudyOptions {
    pub topic: String,
    pub technique: String,
    pub character: Option<String>,
    pub count: Option<usize>,
    pub offline: bool,
}

/// What the user typed at a prompt
enum Input {
    Line(String),
    /// `q` or end of input
    Quit,
}

pub async fn run(
    app: &App,
    options: StudyOptions,
    format: &OutputFormat,
    use_color: bool,
) -> Result<()> {
    let technique: TechniqueId = options.technique.parse()?;
    let character = match options.character.as_deref() {
        Some(name) => Some(find_character(name).context(format!("Unknown character '{}'", name))?),
        None => None,
    };

    let engine = app.build_engine(options.offline)?;
    let handle = engine
        .open_session(&options.topic, options.count, technique, character)
        .await
        .context(format!("Could not start a {} session", technique))?;
    let profile = engine.inspect(handle, |s| s.profile().clone())?;

    println!(
        "{} on {:?}",
        paint(technique.descriptor().name, Color::BOLD, use_color),
        options.topic
    );

    if profile.two_players {
        ask_player_names(&engine, handle).await?;
    }
    if profile.timer_overlay {
        let snapshot = engine.sprint_start(handle)?;
        println!("{}  ([t] pauses and resumes the timer)", render_timer(&snapshot, use_color));
    }

    let report = match profile.order {
        CardOrder::FreeExplore => explore_loop(&engine, handle, use_color).await?,
        CardOrder::Linear | CardOrder::Adaptive => {
            card_loop(&engine, handle, &profile, use_color).await?
        }
    };

    let Some(report) = report else {
        println!("Session abandoned. XP already earned is kept.");
        return Ok(());
    };

    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        OutputFormat::Plain => {
            println!("\n{}", render_report(&report, app.config.levels(), use_color));
        }
    }

    Ok(())
}

async fn card_loop(
    engine: &StudyEngine,
    handle: SessionHandle,
    profile: &TechniqueProfile,
    use_color: bool,
) -> Result<Option<CompletionReport>> {
    loop {
        let (card, header) = engine.inspect(handle, |s| {
            let card = s.current_card().cloned();
            let mut header = match (profile.order, &card) {
                (CardOrder::Adaptive, _) => format!("{} cards in the queue", s.queue().len()),
                (_, Some(card)) => {
                    let index = s.deck().iter().position(|c| c.id == card.id).unwrap_or(0);
                    format!("Card {}/{}", index + 1, s.deck().len())
                }
                (_, None) => String::new(),
            };
            if let Some(board) = s.scoreboard() {
                header.push_str(&format!("  {}'s turn", board.active_player().name));
            }
            (card, header)
        })?;
        let Some(card) = card else {
            break;
        };

        println!("\n{}", render_question(&card.question, &header, use_color));
        print_timer(engine, handle, use_color)?;

        let Some(revealed) = collect_response(engine, handle, profile, &card, use_color).await? else {
            break;
        };
        print_reveal(&revealed, use_color);

        let Some(signal) = ask_grade(profile.grading).await? else {
            break;
        };
        match engine.grade(handle, signal).await? {
            Transition::Applied(outcome) => {
                print_grade(&outcome, use_color);
                if outcome.phase.is_terminal() {
                    break;
                }
            }
            Transition::Rejected(rejection) => println!("{}", rejection.message()),
        }
    }

    match engine.complete_session(handle).await? {
        Transition::Applied(report) => Ok(Some(report)),
        Transition::Rejected(rejection) => bail!("Could not finish the session: {}", rejection.message()),
    }
}

/// Prompt until the card is revealed. `None` when the user quits.
async fn collect_response(
    engine: &StudyEngine,
    handle: SessionHandle,
    profile: &TechniqueProfile,
    card: &Card,
    use_color: bool,
) -> Result<Option<RevealResult>> {
    loop {
        let response = match profile.collecting {
            CollectingMode::None => match prompt("[Enter] reveal, [q] finish >").await? {
                Input::Quit => return Ok(None),
                Input::Line(line) if line == "t" && profile.timer_overlay => {
                    toggle_timer(engine, handle, use_color)?;
                    continue;
                }
                Input::Line(_) => Response::Reveal,
            },
            CollectingMode::Text { .. } => match prompt("Your answer ([q] finish) >").await? {
                Input::Quit => return Ok(None),
                Input::Line(text) => {
                    let check = engine.update_draft(handle, &text)?;
                    if let Some(blocked) = check.blocked_by {
                        println!("{}", paint(&blocked.message(), Color::YELLOW, use_color));
                        continue;
                    }
                    Response::Text(text)
                }
            },
            CollectingMode::Choice { .. } => {
                let Some(choices) = engine.choices(handle)?.filter(|c| c.card_id == card.id) else {
                    bail!("No options were prepared for this card");
                };
                for (i, option) in choices.options.iter().enumerate() {
                    println!("  [{}] {}", i + 1, option);
                }
                match prompt("Pick an option ([q] finish) >").await? {
                    Input::Quit => return Ok(None),
                    Input::Line(line) => match line.parse::<usize>() {
                        Ok(n) if n > 0 => Response::Choice(n - 1),
                        _ => {
                            println!("Enter the number of an option");
                            continue;
                        }
                    },
                }
            }
        };

        match engine.submit_response(handle, response)? {
            Transition::Applied(revealed) => return Ok(Some(revealed)),
            Transition::Rejected(rejection) => {
                println!("{}", paint(&rejection.message(), Color::YELLOW, use_color));
            }
        }
    }
}

async fn ask_grade(grading: GradingMode) -> Result<Option<GradeSignal>> {
    loop {
        let signal = match grading {
            GradingMode::Automatic => return Ok(Some(GradeSignal::Auto)),
            GradingMode::Exploration => bail!("Exploration sessions are not graded per card"),
            GradingMode::SelfAssessed => match prompt("Did you get it right? [y/n] >").await? {
                Input::Quit => return Ok(None),
                Input::Line(line) => match line.to_lowercase().as_str() {
                    "y" | "yes" => GradeSignal::Correct(true),
                    "n" | "no" => GradeSignal::Correct(false),
                    _ => continue,
                },
            },
            GradingMode::DifficultyRating => {
                match prompt(&render_rating_prompt()).await? {
                    Input::Quit => return Ok(None),
                    Input::Line(line) => match line.parse::<u8>() {
                        Ok(rating @ 1..=3) => GradeSignal::Rating(rating),
                        _ => continue,
                    },
                }
            }
        };
        return Ok(Some(signal));
    }
}

async fn explore_loop(
    engine: &StudyEngine,
    handle: SessionHandle,
    use_color: bool,
) -> Result<Option<CompletionReport>> {
    let cards = engine.inspect(handle, |s| s.deck().to_vec())?;
    let mut viewed = HashSet::new();
    print_map(&cards, &viewed, use_color);

    loop {
        let line = match prompt("[v N] view, [c N M] connect, [l] list, [f] finish, [q] quit >").await? {
            Input::Quit => {
                engine.dispose(handle)?;
                return Ok(None);
            }
            Input::Line(line) => line,
        };
        let args: Vec<&str> = line.split_whitespace().collect();
        let pick = |arg: Option<&&str>| {
            arg.and_then(|a| a.parse::<usize>().ok())
                .and_then(|n| n.checked_sub(1))
                .and_then(|i| cards.get(i))
        };

        match args.first().copied() {
            Some("v") => {
                let Some(card) = pick(args.get(1)) else {
                    println!("No such card");
                    continue;
                };
                let outcome = engine.explore(handle, card.id).await?;
                viewed.insert(card.id);
                println!("{}", render_question(&card.question, "", use_color));
                println!("{}", render_answer(&card.answer, use_color));
                if let Some(award) = &outcome.award {
                    println!("{}  session: {} XP", render_award(award, use_color), outcome.session_xp);
                }
            }
            Some("c") => {
                let (Some(from), Some(to)) = (pick(args.get(1)), pick(args.get(2))) else {
                    println!("Connect two cards by number, e.g. c 1 3");
                    continue;
                };
                match engine.connect(handle, from.id, to.id).await? {
                    Transition::Applied(outcome) => match &outcome.award {
                        Some(award) => println!(
                            "{}  {} connections",
                            render_award(award, use_color),
                            outcome.connections
                        ),
                        None => println!("Already connected"),
                    },
                    Transition::Rejected(rejection) => println!("{}", rejection.message()),
                }
            }
            Some("l") => print_map(&cards, &viewed, use_color),
            Some("f") => match engine.complete_session(handle).await? {
                Transition::Applied(report) => return Ok(Some(report)),
                Transition::Rejected(rejection) => {
                    println!("{}", paint(&rejection.message(), Color::YELLOW, use_color));
                }
            },
            _ => {}
        }
    }
}

async fn ask_player_names(engine: &StudyEngine, handle: SessionHandle) -> Result<()> {
    let mut names = Vec::with_capacity(2);
    for default in ["Player 1", "Player 2"] {
        let name = match prompt(&format!("Name for {} >", default)).await? {
            Input::Line(name) if !name.is_empty() => name,
            _ => default.to_string(),
        };
        names.push(name);
    }
    if let Transition::Rejected(rejection) = engine.set_player_names(handle, &names[0], &names[1])? {
        println!("{}", rejection.message());
    }
    Ok(())
}

fn toggle_timer(engine: &StudyEngine, handle: SessionHandle, use_color: bool) -> Result<()> {
    let running = engine
        .timer_snapshot(handle)?
        .is_some_and(|s: SprintSnapshot| s.running);
    let snapshot = if running {
        engine.sprint_pause(handle)?
    } else {
        engine.sprint_start(handle)?
    };
    println!("{}", render_timer(&snapshot, use_color));
    Ok(())
}

fn print_timer(engine: &StudyEngine, handle: SessionHandle, use_color: bool) -> Result<()> {
    if let Some(snapshot) = engine.timer_snapshot(handle)? {
        println!("{}", render_timer(&snapshot, use_color));
    }
    Ok(())
}

fn print_reveal(revealed: &RevealResult, use_color: bool) {
    if let Some(input) = &revealed.user_input {
        println!("{} {}", paint("You wrote:", Color::GRAY, use_color), input);
    }
    println!("{}", render_answer(&revealed.answer, use_color));
    if let Some(choice) = &revealed.choice {
        if choice.correct {
            println!("{}", paint("Correct!", Color::GREEN, use_color));
        } else {
            println!("{}", paint("Not quite.", Color::RED, use_color));
        }
    }
}

fn print_grade(outcome: &GradeOutcome, use_color: bool) {
    let mut line = format!(
        "{}  session: {} XP",
        render_award(&outcome.award, use_color),
        outcome.session_xp
    );
    if outcome.retired {
        line.push_str("  mastered");
    } else if let Some(position) = outcome.requeued_at {
        line.push_str("  ");
        line.push_str(&render_requeue(position));
    }
    println!("{}", line);
}

fn render_award(award: &XpAward, use_color: bool) -> String {
    let mut text = paint(&format!("+{} XP", award.total_xp), Color::YELLOW, use_color);
    if let Some(message) = award.bonus_message() {
        text.push_str("  ");
        text.push_str(&paint(&message, Color::MAGENTA, use_color));
    }
    text
}

fn print_map(cards: &[Card], viewed: &HashSet<uuid::Uuid>, use_color: bool) {
    for (i, card) in cards.iter().enumerate() {
        let marker = if viewed.contains(&card.id) {
            paint("*", Color::GREEN, use_color)
        } else {
            " ".to_string()
        };
        println!("{} [{}] {}", marker, i + 1, card.question);
    }
}

/// Read one trimmed line from stdin without blocking the runtime
async fn prompt(label: &str) -> Result<Input> {
    print!("{} ", label);
    std::io::stdout().flush()?;

    let (read, line) = tokio::task::spawn_blocking(|| {
        let mut buf = String::new();
        let read = std::io::stdin().read_line(&mut buf)?;
        Ok::<_, std::io::Error>((read, buf))
    })
    .await
    .context("stdin reader failed")??;

    let line = line.trim();
    if read == 0 || line == "q" {
        return Ok(Input::Quit);
    }
    Ok(Input::Line(line.to_string()))
}
