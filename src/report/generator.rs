//! Markdown and JSON report generation.
//!
//! Markdown output is meant for people reading a survey's results; JSON
//! output follows the camelCase shapes the web frontend consumes.

use crate::config::ReportConfig;
use crate::models::{
    ApiResponse, ApiSurvey, ApiSurveyStats, QuestionStat, QuestionType, ReportMetadata,
    StatsReport, Survey, SurveyResponse, SurveyStats,
};
use crate::stats::display_value;
use anyhow::Result;
use std::cmp::Reverse;

/// Generate a complete Markdown statistics report.
pub fn generate_markdown_report(report: &StatsReport, options: &ReportConfig) -> String {
    let mut output = String::new();

    // Title
    let title = report
        .survey
        .as_ref()
        .map(|s| s.title.as_str())
        .unwrap_or(report.stats.survey_id.as_str());
    output.push_str(&format!("# Survey Statistics: {}\n\n", title));

    output.push_str(&generate_metadata_section(
        &report.metadata,
        report.survey.as_ref(),
        &report.stats,
    ));

    output.push_str(&generate_summary_section(&report.stats));

    output.push_str(&generate_questions_section(&report.stats, options));

    output.push_str(&generate_footer());

    output
}

/// Generate the metadata section.
fn generate_metadata_section(
    metadata: &ReportMetadata,
    survey: Option<&Survey>,
    stats: &SurveyStats,
) -> String {
    let mut section = String::new();

    section.push_str("## Metadata\n\n");
    section.push_str(&format!("- **Survey ID:** `{}`\n", stats.survey_id));

    match survey {
        Some(survey) => {
            if let Some(ref description) = survey.description {
                section.push_str(&format!("- **Description:** {}\n", description));
            }
            if let Some(ref author) = survey.author_name {
                section.push_str(&format!("- **Author:** {}\n", author));
            }
            if !survey.is_published {
                section.push_str("- **Status:** Draft\n");
            }
        }
        None => section.push_str("- **Status:** Survey not found\n"),
    }

    section.push_str(&format!(
        "- **Generated:** {}\n",
        metadata.generated_at.format("%Y-%m-%d %H:%M:%S UTC")
    ));
    section.push_str(&format!("- **Backend:** {}\n", metadata.backend));
    section.push_str(&format!(
        "- **Total Responses:** {}\n",
        stats.total_responses
    ));
    section.push_str(&format!(
        "- **Questions:** {}\n",
        stats.question_stats.len()
    ));
    section.push_str(&format!(
        "- **Duration:** {:.2}s\n",
        metadata.duration_seconds
    ));
    section.push('\n');

    section
}

/// Generate the one-line-per-question summary table.
fn generate_summary_section(stats: &SurveyStats) -> String {
    let mut section = String::new();

    section.push_str("## Summary\n\n");

    if stats.question_stats.is_empty() {
        section.push_str("This survey has no questions.\n\n");
        return section;
    }

    section.push_str("| # | Question | Type | Counted | Average |\n");
    section.push_str("|:---:|:---|:---|:---:|:---:|\n");

    for (i, qs) in stats.question_stats.iter().enumerate() {
        let average = qs
            .average_rating
            .map(|avg| format!("{:.2}", avg))
            .unwrap_or_else(|| "-".to_string());
        let counted = if qs.question_type == QuestionType::Text {
            "-".to_string()
        } else {
            qs.counted().to_string()
        };

        section.push_str(&format!(
            "| {} | {} | {} | {} | {} |\n",
            i + 1,
            escape_cell(&qs.question),
            qs.question_type,
            counted,
            average
        ));
    }
    section.push('\n');

    section
}

/// Generate one section per question.
fn generate_questions_section(stats: &SurveyStats, options: &ReportConfig) -> String {
    let mut section = String::new();

    if stats.question_stats.is_empty() {
        return section;
    }

    section.push_str("## Questions\n\n");

    for (i, qs) in stats.question_stats.iter().enumerate() {
        section.push_str(&generate_question_block(i + 1, qs, options));
    }

    section
}

/// Generate a single question block.
fn generate_question_block(number: usize, qs: &QuestionStat, options: &ReportConfig) -> String {
    let mut block = String::new();

    block.push_str(&format!("### {}. {}\n\n", number, qs.question));
    block.push_str(&format!(
        "*Type: {} | Counted answers: {}*\n\n",
        qs.question_type,
        qs.counted()
    ));

    if qs.question_type == QuestionType::Text {
        block.push_str("Free-text answers are not aggregated.\n\n");
        return block;
    }

    if let Some(average) = qs.average_rating {
        block.push_str(&format!("**Average rating:** {:.2}\n\n", average));
    }

    if qs.responses.is_empty() {
        block.push_str("No answers yet.\n\n");
        return block;
    }

    let total = qs.counted();

    if options.include_percentages {
        block.push_str("| Answer | Count | Share |\n");
        block.push_str("|:---|:---:|:---:|\n");
    } else {
        block.push_str("| Answer | Count |\n");
        block.push_str("|:---|:---:|\n");
    }

    for (label, count) in ordered_labels(qs, options.sort_by_count) {
        if options.include_percentages {
            block.push_str(&format!(
                "| {} | {} | {:.1}% |\n",
                escape_cell(label),
                count,
                share(count, total)
            ));
        } else {
            block.push_str(&format!("| {} | {} |\n", escape_cell(label), count));
        }
    }
    block.push('\n');

    block
}

/// Labels in display order: by descending count, ties alphabetical.
fn ordered_labels(qs: &QuestionStat, sort_by_count: bool) -> Vec<(&str, u64)> {
    let mut labels: Vec<(&str, u64)> = qs
        .responses
        .iter()
        .map(|(label, count)| (label.as_str(), *count))
        .collect();

    if sort_by_count {
        // BTreeMap iteration is already alphabetical; the sort is stable.
        labels.sort_by_key(|(_, count)| Reverse(*count));
    }

    labels
}

/// Percentage of `count` in `total`.
pub fn share(count: u64, total: u64) -> f64 {
    if total == 0 {
        return 0.0;
    }
    count as f64 / total as f64 * 100.0
}

fn escape_cell(text: &str) -> String {
    text.replace('|', "\\|").replace('\n', " ")
}

/// Generate the report footer.
fn generate_footer() -> String {
    let mut footer = String::new();

    footer.push_str("---\n\n");
    footer.push_str("*Report generated by surveystats*\n");

    footer
}

/// Generate the JSON statistics payload in the frontend shape.
pub fn generate_json_report(stats: &SurveyStats) -> Result<String> {
    serde_json::to_string_pretty(&ApiSurveyStats::from(stats)).map_err(Into::into)
}

/// Generate a Markdown listing of surveys.
pub fn generate_survey_list_markdown(surveys: &[Survey]) -> String {
    let mut output = String::new();

    output.push_str("# Surveys\n\n");

    if surveys.is_empty() {
        output.push_str("No surveys found.\n");
        return output;
    }

    output.push_str("| ID | Title | Questions | Published | Created |\n");
    output.push_str("|:---|:---|:---:|:---:|:---|\n");

    for survey in surveys {
        output.push_str(&format!(
            "| `{}` | {} | {} | {} | {} |\n",
            survey.id,
            escape_cell(&survey.title),
            survey.questions.len(),
            if survey.is_published { "yes" } else { "no" },
            survey.created_at.format("%Y-%m-%d")
        ));
    }

    output
}

/// Generate a JSON listing of surveys in the frontend shape.
pub fn generate_survey_list_json(surveys: &[Survey]) -> Result<String> {
    let api: Vec<ApiSurvey> = surveys.iter().map(ApiSurvey::from).collect();
    serde_json::to_string_pretty(&api).map_err(Into::into)
}

/// Generate a Markdown listing of a survey's responses.
pub fn generate_responses_markdown(survey_id: &str, responses: &[SurveyResponse]) -> String {
    let mut output = String::new();

    output.push_str(&format!("# Responses: {}\n\n", survey_id));

    if responses.is_empty() {
        output.push_str("No responses yet.\n");
        return output;
    }

    for response in responses {
        let who = response
            .respondent_name
            .as_deref()
            .unwrap_or("Anonymous");
        output.push_str(&format!(
            "## {} ({})\n\n",
            who,
            response.submitted_at.format("%Y-%m-%d %H:%M:%S UTC")
        ));

        if response.answers.is_empty() {
            output.push_str("No answers.\n\n");
            continue;
        }

        for answer in &response.answers {
            let shown = match display_value(&answer.answer) {
                serde_json::Value::String(text) => text,
                other => other.to_string(),
            };
            output.push_str(&format!("- `{}`: {}\n", answer.question_id, shown));
        }
        output.push('\n');
    }

    output
}

/// Generate a JSON listing of responses in the frontend shape.
pub fn generate_responses_json(responses: &[SurveyResponse]) -> Result<String> {
    let api: Vec<ApiResponse> = responses.iter().map(ApiResponse::from).collect();
    serde_json::to_string_pretty(&api).map_err(Into::into)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Answer, QuestionStat};
    use chrono::Utc;
    use serde_json::json;
    use std::collections::BTreeMap;

    fn create_test_stats() -> SurveyStats {
        SurveyStats {
            survey_id: "s1".to_string(),
            total_responses: 4,
            question_stats: vec![
                QuestionStat {
                    question_id: "q1".to_string(),
                    question: "How satisfied are you?".to_string(),
                    question_type: QuestionType::Rating,
                    responses: [("3", 1), ("4", 1), ("5", 2)]
                        .into_iter()
                        .map(|(k, v)| (k.to_string(), v))
                        .collect(),
                    average_rating: Some(4.25),
                },
                QuestionStat {
                    question_id: "q2".to_string(),
                    question: "Favourite colour?".to_string(),
                    question_type: QuestionType::SingleChoice,
                    responses: [("Blue", 1), ("Red", 3)]
                        .into_iter()
                        .map(|(k, v)| (k.to_string(), v))
                        .collect(),
                    average_rating: None,
                },
                QuestionStat {
                    question_id: "q3".to_string(),
                    question: "Comments".to_string(),
                    question_type: QuestionType::Text,
                    responses: BTreeMap::new(),
                    average_rating: None,
                },
                QuestionStat {
                    question_id: "q4".to_string(),
                    question: "Pipes | in text".to_string(),
                    question_type: QuestionType::YesNo,
                    responses: BTreeMap::new(),
                    average_rating: None,
                },
            ],
        }
    }

    fn create_test_survey() -> Survey {
        Survey {
            id: "s1".to_string(),
            title: "Product Feedback".to_string(),
            description: Some("Quarterly".to_string()),
            user_id: None,
            author_id: None,
            author_name: Some("Research Team".to_string()),
            is_published: true,
            created_at: Utc::now(),
            updated_at: Utc::now(),
            questions: Vec::new(),
        }
    }

    fn create_test_report(survey: Option<Survey>) -> StatsReport {
        StatsReport {
            metadata: ReportMetadata {
                backend: "memory".to_string(),
                generated_at: Utc::now(),
                duration_seconds: 0.01,
            },
            survey,
            stats: create_test_stats(),
        }
    }

    #[test]
    fn test_generate_markdown_report() {
        let report = create_test_report(Some(create_test_survey()));
        let markdown = generate_markdown_report(&report, &ReportConfig::default());

        assert!(markdown.contains("# Survey Statistics: Product Feedback"));
        assert!(markdown.contains("## Metadata"));
        assert!(markdown.contains("## Summary"));
        assert!(markdown.contains("## Questions"));
        assert!(markdown.contains("**Total Responses:** 4"));
        assert!(markdown.contains("**Author:** Research Team"));
        assert!(markdown.contains("**Average rating:** 4.25"));
        assert!(markdown.contains("| Red | 3 | 75.0% |"));
        assert!(markdown.contains("Free-text answers are not aggregated."));
        assert!(markdown.contains("No answers yet."));
        assert!(markdown.contains("Pipes \\| in text"));
    }

    #[test]
    fn test_markdown_for_missing_survey() {
        let report = create_test_report(None);
        let markdown = generate_markdown_report(&report, &ReportConfig::default());

        assert!(markdown.contains("# Survey Statistics: s1"));
        assert!(markdown.contains("Survey not found"));
    }

    #[test]
    fn test_label_ordering() {
        let stats = create_test_stats();
        let colour = &stats.question_stats[1];

        let by_count: Vec<&str> =
            ordered_labels(colour, true).into_iter().map(|(l, _)| l).collect();
        assert_eq!(by_count, vec!["Red", "Blue"]);

        let alphabetical: Vec<&str> =
            ordered_labels(colour, false).into_iter().map(|(l, _)| l).collect();
        assert_eq!(alphabetical, vec!["Blue", "Red"]);
    }

    #[test]
    fn test_without_percentages() {
        let report = create_test_report(None);
        let options = ReportConfig {
            include_percentages: false,
            sort_by_count: true,
        };
        let markdown = generate_markdown_report(&report, &options);

        assert!(markdown.contains("| Red | 3 |\n"));
        assert!(!markdown.contains("Share"));
    }

    #[test]
    fn test_share() {
        assert_eq!(share(1, 4), 25.0);
        assert_eq!(share(0, 0), 0.0);
    }

    #[test]
    fn test_generate_json_report() {
        let json = generate_json_report(&create_test_stats()).unwrap();

        assert!(json.contains("\"surveyId\""));
        assert!(json.contains("\"totalResponses\": 4"));
        assert!(json.contains("\"questionStats\""));
        assert!(json.contains("\"averageRating\": 4.25"));
        assert!(!json.contains("survey_id"));
    }

    #[test]
    fn test_survey_list() {
        let surveys = vec![create_test_survey()];

        let markdown = generate_survey_list_markdown(&surveys);
        assert!(markdown.contains("| `s1` | Product Feedback | 0 | yes |"));
        assert!(generate_survey_list_markdown(&[]).contains("No surveys found."));

        let json = generate_survey_list_json(&surveys).unwrap();
        assert!(json.contains("\"isPublished\": true"));
        assert!(json.contains("\"authorName\": \"Research Team\""));
    }

    #[test]
    fn test_responses_listing() {
        let responses = vec![SurveyResponse {
            id: "r1".to_string(),
            survey_id: "s1".to_string(),
            user_id: None,
            respondent_name: None,
            respondent_email: None,
            respondent_age: None,
            submitted_at: Utc::now(),
            answers: vec![
                Answer {
                    id: "a1".to_string(),
                    response_id: "r1".to_string(),
                    question_id: "q2".to_string(),
                    answer: json!("[\"A\",\"B\"]"),
                    created_at: Utc::now(),
                },
                Answer {
                    id: "a2".to_string(),
                    response_id: "r1".to_string(),
                    question_id: "q3".to_string(),
                    answer: json!("Great work"),
                    created_at: Utc::now(),
                },
            ],
        }];

        let markdown = generate_responses_markdown("s1", &responses);
        assert!(markdown.contains("## Anonymous"));
        assert!(markdown.contains("- `q2`: [\"A\",\"B\"]"));
        assert!(markdown.contains("- `q3`: Great work\n"));

        let json = generate_responses_json(&responses).unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed[0]["answers"][0]["answer"], json!(["A", "B"]));
        assert_eq!(parsed[0]["surveyId"], json!("s1"));
    }
}
