//! Prompts for the planner, replanner, search sub-agent and accuracy judge.
//!
//! Static instruction text lives in constants; the taxonomy sections are
//! rendered from `cadence_core::taxonomy` so prompts and the harness agree
//! on the same option lists.

use cadence_core::taxonomy::{genres_for_goal, LocationClass, GENRES, GOALS, LOCATIONS, VIBES};

use crate::providers::ChatMessage;
use crate::state::RunState;

/// Instruction that seeds every bridge run.
pub const SEED_INSTRUCTION: &str =
    "Recommend three tracks following the taxonomy and audio-feature format.";

/// Search planner system prompt.
pub const PLANNER_SYSTEM_PROMPT: &str = r#"
You are a search planner for a context-aware music recommender.
Read the listener's context and preference and write a short, ordered list
of concrete web searches that will surface real tracks for them.

## Rules
1. Every search combines the context (location and goal) with a genre.
   - Bad: "Metallica songs"
   - Good: "acoustic Metallica covers for studying in a library"
2. Use the taxonomy below for locations and goals.
3. Three steps at most. Each step is one self-contained search task.

## Output
Return JSON: {"steps": ["...", "..."]}
"#;

/// Replanner and final-answer system prompt.
pub const REPLANNER_SYSTEM_PROMPT: &str = r#"
You are a context-aware music recommendation expert.
Using the search results gathered so far and the listener's information,
either write the final recommendation or ask for more searches.

## Logic Matrix
Goal sets the base audio-feature ranges:
- focus / sleep: energy 0.0-0.4, tempo 60-90 BPM, instrumentalness 0.7-1.0
- relax / consolation: acousticness 0.6-1.0, valence 0.3-0.6
- active / anger: energy 0.7-1.0, tempo 120+ BPM, valence 0.6+

Location refines vibe and instrumentalness:
- strict (library, co-working): no distracting vocals, instrumentalness 0.8-1.0
- casual (cafe, home, park): humming and light vocals are fine
- active (gym, moving): rhythm is required

Noise level fine-tunes energy inside the goal's range:
- silent / quiet: low end of the range
- loud / very loud: high end of the range, to mask the noise

## Reasoning Steps
1. Goal: pick the genre and the base feature ranges.
2. Location: settle vibe and instrumentalness.
3. Noise: adjust energy without leaving the base range.

## Primary Tag
Format `{goal}_{genre}_{vibe}`. The goal is the listener's goal verbatim.

## Critical Rules
1. When preference and context conflict, the context wins but keep the
   feel of the preferred genre (library + metal: acoustic metal, post-rock).
2. Recommend only tracks that really exist on Spotify.
3. In the reasoning, name the key terms (goal, location, genre, vibe) in
   English.

## Output Format
The final recommendation is a raw JSON list without markdown:
[
  {
    "recommendation_meta": {
      "reasoning": "why this track fits the location, goal and noise level",
      "primary_tag": "{goal}_{genre}_{vibe}"
    },
    "track_info": {
      "artist_name": "Exact Artist Name",
      "track_title": "Exact Track Title"
    },
    "target_audio_features": {
      "min_tempo": 60,
      "max_tempo": 90,
      "target_energy": 0.2,
      "target_instrumentalness": 0.9,
      "target_valence": 0.4,
      "target_acousticness": 0.7
    }
  }
]

## Action Guideline
- If at least one search has run and there is enough to recommend from,
  put the JSON list in "response" right away and leave "plan" empty.
- Do not repeat searches chasing perfect information.
- Otherwise return the remaining searches in "plan".

Return JSON: {"response": "<JSON list as a string>" | null, "plan": ["..."] | null}
"#;

/// Accuracy judge system prompt.
pub const JUDGE_SYSTEM_PROMPT: &str = r#"
You evaluate the quality of music recommendations.
Compare the listener's requirements (Criteria) with the recommender's
output (Output) and score it.

## Scoring (0-100)
1. Fit with the context
2. Use of the stated preference
3. Resolution of conflicts between context and preference

## Output (JSON)
{"score": 85, "reason": "..."}
"#;

/// Search sub-agent system prompt.
pub const EXECUTOR_SYSTEM_PROMPT: &str = r#"
You are a music research assistant with a web search tool.
Complete the task you are given: search as often as needed, then answer
with the concrete artists and track titles you found and why they fit.
Answer in plain text.
"#;

/// Option lists rendered for prompts.
pub fn taxonomy_guide() -> String {
    let mut guide = String::from("## Taxonomy\n");
    guide.push_str(&format!("- Locations: {}\n", LOCATIONS.join(", ")));
    guide.push_str(&format!("- Goals: {}\n", GOALS.join(", ")));
    guide.push_str(&format!("- Genres: [{}]\n", GENRES.join(", ")));
    guide.push_str(&format!("- Vibes: [{}]\n", VIBES.join(", ")));
    guide
}

/// Genre and vibe hints for one listener context.
pub fn context_hints(goal: &str, location: &str) -> String {
    let mut hints = String::new();
    let genres = genres_for_goal(goal);
    if !genres.is_empty() {
        hints.push_str(&format!("- Genres for {}: {}\n", goal, genres.join(", ")));
    }
    if let Some(class) = LocationClass::of(location) {
        hints.push_str(&format!("- Vibes for {}: {}\n", location, class.vibes().join(", ")));
    }
    hints
}

fn listener_block(state: &RunState) -> String {
    format!(
        "Context: {}\nPreference: {}",
        state.context_json(),
        state.preference_json()
    )
}

pub fn planner_messages(state: &RunState) -> Vec<ChatMessage> {
    let system = format!("{}\n{}", PLANNER_SYSTEM_PROMPT.trim(), taxonomy_guide());
    let user = format!("{}\nRequest: {}", listener_block(state), state.input);
    vec![ChatMessage::system(system), ChatMessage::user(user)]
}

pub fn replanner_messages(state: &RunState) -> Vec<ChatMessage> {
    let system = format!(
        "{}\n{}\n## Hints\n{}\n## Listener\n{}",
        REPLANNER_SYSTEM_PROMPT.trim(),
        taxonomy_guide(),
        context_hints(&state.context.goal, &state.context.location),
        listener_block(state)
    );

    let mut steps = String::new();
    for (idx, step) in state.past_steps().iter().enumerate() {
        steps.push_str(&format!("{}. {}\n{}\n\n", idx + 1, step.task, step.result));
    }

    let user = format!(
        "Original goal: {}\n\nCurrent plan: {:?}\n\nCompleted steps and results:\n{}\
         Decide now: write the JSON list in 'response' if the information is enough, \
         otherwise write 'plan'.",
        state.input,
        state.plan(),
        steps
    );
    vec![ChatMessage::system(system), ChatMessage::user(user)]
}

/// The task handed to the sub-agent, enriched with the listener record.
pub fn executor_messages(task: &str, state: &RunState) -> Vec<ChatMessage> {
    let user = format!(
        "Listener context: {}\nListener preference: {}\n\n\
         Using the information above, carry out this search task: {}",
        state.context_json(),
        state.preference_json(),
        task
    );
    vec![
        ChatMessage::system(EXECUTOR_SYSTEM_PROMPT.trim()),
        ChatMessage::user(user),
    ]
}

pub fn judge_messages(criteria: &str, input_summary: &str, output: &str) -> Vec<ChatMessage> {
    let user = format!(
        "Criteria: {}\nUser Input: {}\nOutput: {}",
        criteria, input_summary, output
    );
    vec![
        ChatMessage::system(JUDGE_SYSTEM_PROMPT.trim()),
        ChatMessage::user(user),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use cadence_core::BridgeInput;

    fn state() -> RunState {
        RunState::from_bridge_input(
            SEED_INSTRUCTION,
            &BridgeInput::new()
                .location("library")
                .decibel("silent")
                .goal("focus")
                .user_pref("Heavy Metal")
                .user_artist("Metallica"),
        )
    }

    #[test]
    fn test_taxonomy_guide_lists_options() {
        let guide = taxonomy_guide();
        assert!(guide.contains("co-working"));
        assert!(guide.contains("lo-fi"));
        assert!(guide.contains("melancholy"));
    }

    #[test]
    fn test_context_hints() {
        let hints = context_hints("focus", "library");
        assert!(hints.contains("ambient"));
        assert!(hints.contains("calm"));
        assert!(context_hints("neutral", "mars").is_empty());
    }

    #[test]
    fn test_planner_messages_carry_listener() {
        let messages = planner_messages(&state());
        assert_eq!(messages[0].role, "system");
        assert!(messages[1].content.contains("\"goal\":\"focus\""));
        assert!(messages[1].content.contains("Metallica"));
        assert!(messages[1].content.contains(SEED_INSTRUCTION));
    }

    #[test]
    fn test_replanner_messages_include_past_steps() {
        let mut state = state();
        state.install_plan(vec!["search calm post-rock".into()]);
        state.record_step("search calm post-rock", "Explosions in the Sky - Your Hand in Mine");
        let messages = replanner_messages(&state);
        assert!(messages[1].content.contains("Your Hand in Mine"));
        assert!(messages[1].content.contains("search calm post-rock"));
        assert!(messages[0].content.contains("primary_tag"));
    }

    #[test]
    fn test_executor_task_enriched() {
        let messages = executor_messages("find acoustic metal covers", &state());
        assert!(messages[1].content.contains("find acoustic metal covers"));
        assert!(messages[1].content.contains("library"));
    }

    #[test]
    fn test_judge_prompt_asks_for_score() {
        assert!(JUDGE_SYSTEM_PROMPT.contains("\"score\""));
        let messages = judge_messages("calm", "Location: library", "[]");
        assert!(messages[1].content.starts_with("Criteria: calm"));
    }
}
