//! Instructions sent to the text generator.

use crate::core::sections::SECTION_TITLES;

/// Batch ticker lookup: one name per line, answer as a JSON array.
pub fn ticker_mapping_prompt(names: &[String], suffix: &str) -> String {
    format!(
        r#"Map the following common Indian stock or mutual fund names to their correct Yahoo Finance ticker symbols (with {suffix} suffix if needed). If the name is unrecognized or ambiguous, respond with "N/A".

Return only JSON in the format:
[
  {{ "name": "ICICI Prudential Nifty Midcap 250 Index Fund - Growth", "ticker": "ICICIMCAP{suffix}" }},
  {{ "name": "My Gold", "ticker": "GOLDBEES{suffix}" }},
  ...
]

Names:
{names}
"#,
        suffix = suffix,
        names = names.join("\n"),
    )
}

/// Report generation instructions for a set of portfolio screenshots.
pub fn report_prompt(goal: &str) -> String {
    let sections = SECTION_TITLES
        .iter()
        .enumerate()
        .map(|(i, title)| format!("{}. *{}*", i + 1, title))
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        r#"You are a professional financial advisor AI. Your ONLY task is to analyze the user's investment portfolio using ONLY the data DIRECTLY VISIBLE in the uploaded screenshots. Do not use external knowledge or assume any information. If a piece of data is not visible, state "N/A" or "Not visible in screenshot."

USER GOAL: "{goal}"

INSTRUCTIONS:
- Generate a report with EXACTLY 8 sections.
- Use the precise titles and formatting: 1. *Section Title*.
- Each section (1-7) should be 2-4 short paragraphs.
- For sections 2, 3, 4 and 5 give a direct assessment based on the best inferences possible from the visible data, and state the assumptions made.
- Section 8 MUST be a markdown table containing ONLY the assets visible in the screenshot.

REQUIRED SECTIONS:
{sections}

SECTION 8 FORMAT:
- Use these exact column headers: "Asset Name", "Type", "Invested Amount", "Current Value".
- Asset Name: the exact text from the 'Instrument' column.
- Type: 'Stock' for every asset in the holdings table.
- Invested Amount: 'Qty' multiplied by 'Avg. cost', formatted as currency (e.g. ₹1234.56), or "N/A" if either is not visible.
- Current Value: the value from the 'Cur. val' column, formatted as currency.
- Example:
Asset Name | Type | Invested Amount | Current Value
-----------|------|-----------------|--------------
PAYTM      | Stock| ₹49684.80       | ₹11251.35
SUVIDHAA   | Stock| ₹54068.72       | ₹19703.76

GUIDANCE:
2. Goal Alignment Grade: assign a letter grade (A, B, C or D) and explain it.
3. Goal Alignment Percentage: a qualitative range such as "Moderate alignment (30-70%)".
4. Risk Meter: one of "Very Low", "Low", "Moderate", "High", "Very High", with justification.
5. Estimated 5-Year Return: a qualitative outlook such as "Moderate Growth Potential". Do not give a numerical percentage.
"#,
        goal = goal,
        sections = sections,
    )
}
