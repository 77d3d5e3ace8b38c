//! Built-in card templates, used by `cardforge --init` and in tests.
//!
//! Each template exercises a different placeholder family.

/// Plain card: CSV columns and row numbering.
pub fn basic_card_template() -> &'static str {
    r##"<div class="card" style="width: 100%; height: 100%; box-sizing: border-box; border: 2px solid #1a365d; border-radius: 12px; padding: 16px; font-family: sans-serif">
    <header style="display: flex; justify-content: space-between; font-weight: bold">
        <span class="name">{{Name}}</span>
        <span class="cost">{{Cost}}</span>
    </header>
    <p class="text">{{Text}}</p>
    <footer style="font-size: 10px; color: #718096">#{{index1}}</footer>
</div>
"##
}

/// Localized card: names and labels come from the active bundle, falling
/// back to the raw CSV fields.
pub fn localized_card_template() -> &'static str {
    r##"<div class="card" style="width: 100%; height: 100%; padding: 16px; font-family: sans-serif">
    <h1 class="name">{{t:card.Name}}</h1>
    <p class="type">{{t:common.type}}: {{t:card.Type}}</p>
    <p class="text">{{ i18n:card.Text }}</p>
    <footer>{{t:columns.Cost}} {{Cost}}</footer>
</div>
"##
}

/// Card with artwork, a stylesheet and a CSS background, all relative to the
/// project root.
pub fn illustrated_card_template() -> &'static str {
    r##"<link rel="stylesheet" href="styles/card.css">
<div class="card" style="background: url('art/paper.png') center / cover">
    <img class="art" src="art/{{id}}.png" alt="{{Name}}">
    <h1 class="name">{{Name}}</h1>
    <img class="icon" src="https://example.com/icons/{{Type}}.svg">
</div>
"##
}

/// Minimal template for unit testing.
pub fn minimal_card_template() -> &'static str {
    r#"<div><h1>{{Name}}</h1><p>{{index}}</p></div>"#
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::deck::{CardRecord, ColumnNames};
    use crate::template::{render, MISSING_TRANSLATION_CLASS, UNKNOWN_PLACEHOLDER_CLASS};

    #[test]
    fn templates_render_cleanly_for_a_complete_row() {
        let card = CardRecord::from_pairs([
            ("id", "fire"),
            ("Name", "Fireball"),
            ("Cost", "3"),
            ("Type", "spell"),
            ("Text", "Deal 3 damage."),
        ]);
        let templates: Vec<(&str, &str)> = vec![
            ("basic", basic_card_template()),
            ("illustrated", illustrated_card_template()),
            ("minimal", minimal_card_template()),
        ];

        for (name, template) in templates {
            let html = render(template, &card, 0, None, &ColumnNames::default());
            assert!(
                !html.contains(UNKNOWN_PLACEHOLDER_CLASS) && !html.contains("{{"),
                "Template '{}' left placeholders unresolved",
                name
            );
        }
    }

    #[test]
    fn localized_template_marks_untranslated_labels() {
        let card = CardRecord::from_pairs([("id", "fire"), ("Name", "Fireball"), ("Cost", "3")]);
        let html = render(localized_card_template(), &card, 0, None, &ColumnNames::default());
        assert!(html.contains("Fireball"));
        // `common.type` has no bundle and no `type` column.
        assert!(html.contains(MISSING_TRANSLATION_CLASS));
    }
}
