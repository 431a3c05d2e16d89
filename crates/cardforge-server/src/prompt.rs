//! Text prompt rendering for downstream image generation.
//!
//! The prompt is a pure function of the request: a framed visual layout,
//! a structured JSON block, and a static style guide.  Identical input yields
//! byte-identical output.

use serde::Serialize;

use crate::schemas::CardGenerationRequest;

const SKILL_NAME_MAX: usize = 12;
const SKILL_DESC_MAX: usize = 30;
const FLAVOR_TEXT_MAX: usize = 35;

/// Render the generation prompt for a card.
pub fn render_prompt(request: &CardGenerationRequest) -> String {
    let data = &request.card_data;

    let type_str = or_placeholder(&data.card_type, "[type]");
    let rarity_str = or_placeholder(&data.rarity, "[rarity]");
    let name_str = or_placeholder(&data.card_name, "[card name]");
    let attribute_str = or_placeholder(&data.attribute, "[attribute]");
    let attack_str = non_blank(data.attack.as_deref()).unwrap_or("0");
    let health_str = non_blank(data.health.as_deref()).unwrap_or("0");
    let series_str = non_blank(data.series.as_deref()).unwrap_or("[series]");

    let mut prompt = String::new();
    prompt.push_str("Generate a trading-card-game style card illustration.\n\n");
    prompt.push_str("=== Card Layout (visual structure) ===\n\n");
    prompt.push_str("┌─────────────────────────────────────────┐\n");
    prompt.push_str("│  [Background image - Layer 2 (full)]    │\n");
    prompt.push_str("│  ┌─────────────────────────────────┐   │\n");
    prompt.push_str("│  │                                 │   │\n");

    // Header row: type, rarity, name, attribute.
    prompt.push_str(&format!(
        "│  │  ⭕{type_str}  {rarity_str}  {name_str}  {attribute_str}⭕ │\n"
    ));
    prompt.push_str("│  │  ─────────────────────────────  │\n");
    prompt.push_str("│  │                                 │\n");

    // Main character layer.
    prompt.push_str("│  │   [Main character - Layer 1]    │\n");
    prompt.push_str("│  │                                 │\n");
    prompt.push_str("│  │  ─────────────────────────────  │\n");

    // Skill blocks, rendered only when the skill name is non-blank.
    for (label, name, description) in [
        ("Skill 1", &data.skill1_name, &data.skill1_description),
        ("Skill 2", &data.skill2_name, &data.skill2_description),
    ] {
        if let Some(name) = non_blank(name.as_deref()) {
            let name = truncate_chars(name, SKILL_NAME_MAX);
            let desc = truncate_chars(
                description.as_deref().unwrap_or(""),
                SKILL_DESC_MAX,
            );
            prompt.push_str(&format!("│  │  [{label}] {name:<20}│\n"));
            prompt.push_str(&format!("│  │  • {desc:<30}│\n"));
            prompt.push_str("│  │                                 │\n");
        }
    }

    prompt.push_str("│  │  ─────────────────────────────  │\n");

    // Flavor text.
    if let Some(flavor) = non_blank(data.flavor_text.as_deref()) {
        let flavor = truncate_chars(flavor, FLAVOR_TEXT_MAX);
        prompt.push_str(&format!("│  │  \"{flavor:<35}\"│\n"));
        prompt.push_str("│  │                                 │\n");
    }

    // Stat line.
    let stats = format!("⚔️ {attack_str}  ❤️ {health_str}");
    prompt.push_str(&format!("│  │  {stats:<35}│\n"));
    prompt.push_str("│  │                                 │\n");

    // Meta line.  The serial number is database-assigned, so only the series
    // appears here.
    prompt.push_str(&format!("│  │  {series_str:<35}│\n"));
    prompt.push_str("│  └─────────────────────────────────┘   │\n");
    prompt.push_str("└─────────────────────────────────────────┘\n");
    prompt.push_str("(All text is overlaid on the background as a transparent layer)\n\n");

    // Structured block.
    prompt.push_str("=== Card Data (structured) ===\n\n");

    let mut skills = Vec::new();
    for (name, description) in [
        (&data.skill1_name, &data.skill1_description),
        (&data.skill2_name, &data.skill2_description),
    ] {
        if let Some(name) = non_blank(name.as_deref()) {
            skills.push(SkillSpec {
                name,
                description: description.as_deref().unwrap_or(""),
            });
        }
    }

    let spec = PromptSpec {
        layout: LayoutSpec {
            layer2: LayerSpec {
                kind: "background image",
                description: "background image covering the whole card",
                reference: request.background_image_url.as_deref().unwrap_or("none"),
            },
            layer1: LayerSpec {
                kind: "main character image",
                description: "main character centered above the background",
                reference: request.character_image_url.as_deref().unwrap_or("none"),
            },
        },
        header: HeaderSpec {
            card_type: type_str,
            rarity: rarity_str,
            card_name: name_str,
            attribute: attribute_str,
        },
        skills,
        stats: StatsSpec {
            attack: attack_str,
            health: health_str,
        },
        description: non_blank(data.flavor_text.as_deref()),
        meta: MetaSpec { series: series_str },
    };

    // Struct serialization preserves field order, so the block is stable.
    prompt.push_str(
        &serde_json::to_string_pretty(&spec).unwrap_or_else(|_| "{}".to_string()),
    );
    prompt.push_str("\n\n");

    // Style guide.
    prompt.push_str("=== Style Guide ===\n");
    prompt.push_str("- Trading card game style (Pokemon / One Piece cards as reference)\n");
    prompt.push_str("- All text overlaid on a highly transparent backing\n");
    prompt.push_str("- Background image covers the card, character and text on top\n");
    prompt.push_str("- Detailed, professional illustration quality\n");
    prompt.push_str("- Card aspect ratio: 5:7 (portrait, based on 400x560px)\n");

    prompt
}

// ---------------------------------------------------------------------------
// JSON block structure
// ---------------------------------------------------------------------------

#[derive(Serialize)]
struct PromptSpec<'a> {
    layout: LayoutSpec<'a>,
    header: HeaderSpec<'a>,
    skills: Vec<SkillSpec<'a>>,
    stats: StatsSpec<'a>,
    description: Option<&'a str>,
    meta: MetaSpec<'a>,
}

#[derive(Serialize)]
struct LayoutSpec<'a> {
    layer2: LayerSpec<'a>,
    layer1: LayerSpec<'a>,
}

#[derive(Serialize)]
struct LayerSpec<'a> {
    #[serde(rename = "type")]
    kind: &'a str,
    description: &'a str,
    reference: &'a str,
}

#[derive(Serialize)]
struct HeaderSpec<'a> {
    #[serde(rename = "type")]
    card_type: &'a str,
    rarity: &'a str,
    #[serde(rename = "cardName")]
    card_name: &'a str,
    attribute: &'a str,
}

#[derive(Serialize)]
struct SkillSpec<'a> {
    name: &'a str,
    description: &'a str,
}

#[derive(Serialize)]
struct StatsSpec<'a> {
    attack: &'a str,
    health: &'a str,
}

#[derive(Serialize)]
struct MetaSpec<'a> {
    series: &'a str,
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.filter(|s| !s.trim().is_empty())
}

fn or_placeholder<'a>(value: &'a str, placeholder: &'a str) -> &'a str {
    if value.trim().is_empty() {
        placeholder
    } else {
        value
    }
}

fn truncate_chars(s: &str, max: usize) -> String {
    s.chars().take(max).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schemas::CardData;

    fn fire_drake_request() -> CardGenerationRequest {
        CardGenerationRequest {
            card_data: CardData {
                card_name: "Fire Drake".to_string(),
                card_type: "Dragon".to_string(),
                attribute: "Fire".to_string(),
                rarity: "Legendary".to_string(),
                attack: Some("50".to_string()),
                health: Some("30".to_string()),
                skill1_name: Some("Flame Burst".to_string()),
                skill1_description: Some("Deal 20 damage to any target".to_string()),
                flavor_text: Some("Born of cinder and storm.".to_string()),
                series: Some("First Edition".to_string()),
                ..Default::default()
            },
            character_image_url: Some("/data/upload/char.png".to_string()),
            background_image_url: None,
        }
    }

    #[test]
    fn prompt_is_deterministic() {
        let request = fire_drake_request();
        assert_eq!(render_prompt(&request), render_prompt(&request));
    }

    #[test]
    fn prompt_contains_core_fields() {
        let prompt = render_prompt(&fire_drake_request());

        assert!(prompt.contains("Fire Drake"));
        assert!(prompt.contains("Dragon"));
        assert!(prompt.contains("Legendary"));
        assert!(prompt.contains("Fire"));
        assert!(prompt.contains("⚔️ 50  ❤️ 30"));
        assert!(prompt.contains("/data/upload/char.png"));
    }

    #[test]
    fn skill_block_omitted_when_name_blank() {
        let mut request = fire_drake_request();
        request.card_data.skill2_name = Some("   ".to_string());

        let prompt = render_prompt(&request);
        assert!(prompt.contains("[Skill 1]"));
        assert!(!prompt.contains("[Skill 2]"));
    }

    #[test]
    fn skill_fields_are_truncated_in_layout() {
        let mut request = fire_drake_request();
        request.card_data.skill1_name = Some("An Extremely Long Skill Name".to_string());

        let prompt = render_prompt(&request);
        // 12-char cutoff in the visual block; the JSON block keeps it whole.
        assert!(prompt.contains("[Skill 1] An Extremely"));
        assert!(prompt.contains("\"name\": \"An Extremely Long Skill Name\""));
    }

    #[test]
    fn stats_default_to_zero() {
        let mut request = fire_drake_request();
        request.card_data.attack = None;
        request.card_data.health = Some("".to_string());

        let prompt = render_prompt(&request);
        assert!(prompt.contains("⚔️ 0  ❤️ 0"));
    }

    #[test]
    fn missing_image_references_render_as_none() {
        let mut request = fire_drake_request();
        request.character_image_url = None;

        let prompt = render_prompt(&request);
        assert!(prompt.contains("\"reference\": \"none\""));
    }
}
