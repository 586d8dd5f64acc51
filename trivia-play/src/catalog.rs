//! Building a playable trivia from the external question bank.
//!
//! The backend only plays trivias it stores, so an external game first
//! copies the fetched questions into a new published trivia and then starts
//! a session on it like any other.

use rand::seq::SliceRandom;
use rand::Rng;
use trivia_client::{
    CatalogGateway, ExternalQuery, ExternalQuestion, NewOption, NewQuestion, NewTrivia,
    TriviaSummary,
};

use crate::error::{GameError, GameResult};

/// Most questions a single import may ask for.
pub const MAX_EXTERNAL_QUESTIONS: u32 = 50;

pub fn validate_query(query: &ExternalQuery) -> GameResult<()> {
    if query.amount == 0 || query.amount > MAX_EXTERNAL_QUESTIONS {
        return Err(GameError::InvalidImport(format!(
            "ask for between 1 and {MAX_EXTERNAL_QUESTIONS} questions, not {}",
            query.amount
        )));
    }
    Ok(())
}

/// Questions to create under `trivia_id`. The correct answer is shuffled in
/// among the incorrect ones and points follow the difficulty.
pub fn to_new_questions<R>(
    trivia_id: &str,
    questions: &[ExternalQuestion],
    rng: &mut R,
) -> Vec<NewQuestion>
where
    R: Rng + ?Sized,
{
    questions
        .iter()
        .map(|q| {
            let mut options: Vec<NewOption> = std::iter::once(NewOption {
                text: q.correct_answer.clone(),
                is_correct: true,
            })
            .chain(q.incorrect_answers.iter().map(|answer| NewOption {
                text: answer.clone(),
                is_correct: false,
            }))
            .collect();
            options.shuffle(rng);

            NewQuestion {
                trivia_id: trivia_id.to_string(),
                question_text: q.text.clone(),
                question_type: q.kind.question_type(),
                options,
                correct_answer: q.correct_answer.clone(),
                points_value: q.difficulty.points(),
            }
        })
        .collect()
}

/// Fetch questions for `query` and store them as a new trivia filed under
/// the catalog's first category.
pub async fn import_external<G>(gateway: &G, query: &ExternalQuery) -> GameResult<TriviaSummary>
where
    G: CatalogGateway + ?Sized,
{
    validate_query(query)?;

    let category = gateway
        .categories()
        .await?
        .into_iter()
        .next()
        .ok_or_else(|| GameError::InvalidImport("the catalog has no categories".to_string()))?;

    let fetched = gateway.external_questions(query).await?;
    if fetched.is_empty() {
        return Err(GameError::InvalidImport(
            "the question bank returned nothing".to_string(),
        ));
    }

    let trivia = gateway
        .create_trivia(&NewTrivia {
            title: format!("Open Trivia - {}", query.difficulty.as_str()),
            category_id: category.id,
            difficulty_level: query.difficulty,
            status: "published".to_string(),
            is_public: true,
        })
        .await?;

    let questions = to_new_questions(&trivia.trivia_id, &fetched, &mut rand::rng());
    for question in &questions {
        gateway.create_question(question).await?;
    }

    tracing::info!(
        trivia_id = %trivia.trivia_id,
        questions = questions.len(),
        difficulty = query.difficulty.as_str(),
        "imported external trivia"
    );
    Ok(trivia)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use trivia_client::{
        Category, Difficulty, ExternalQuestionKind, MockCall, MockSessionGateway, QuestionType,
    };

    fn bank_question(text: &str, difficulty: Difficulty) -> ExternalQuestion {
        ExternalQuestion {
            text: text.to_string(),
            kind: ExternalQuestionKind::Multiple,
            difficulty,
            correct_answer: "right".to_string(),
            incorrect_answers: vec!["w1".to_string(), "w2".to_string(), "w3".to_string()],
        }
    }

    fn mock_with_bank(count: usize) -> MockSessionGateway {
        MockSessionGateway::new()
            .with_categories(vec![Category {
                id: "cat-1".into(),
                name: "General".into(),
            }])
            .with_external_bank(
                (0..count)
                    .map(|i| bank_question(&format!("Q{i}"), Difficulty::Hard))
                    .collect(),
            )
    }

    #[test]
    fn test_amount_bounds() {
        for amount in [0, MAX_EXTERNAL_QUESTIONS + 1] {
            let query = ExternalQuery {
                amount,
                ..ExternalQuery::default()
            };
            assert!(matches!(
                validate_query(&query),
                Err(GameError::InvalidImport(_))
            ));
        }
        let query = ExternalQuery {
            amount: MAX_EXTERNAL_QUESTIONS,
            ..ExternalQuery::default()
        };
        assert!(validate_query(&query).is_ok());
    }

    #[test]
    fn test_exactly_one_correct_option_after_shuffle() {
        let mut rng = StdRng::seed_from_u64(7);
        let questions = [
            bank_question("a", Difficulty::Easy),
            ExternalQuestion {
                kind: ExternalQuestionKind::Boolean,
                incorrect_answers: vec!["False".to_string()],
                correct_answer: "True".to_string(),
                ..bank_question("b", Difficulty::Medium)
            },
        ];

        let created = to_new_questions("t1", &questions, &mut rng);
        assert_eq!(created.len(), 2);
        for (new, source) in created.iter().zip(&questions) {
            let correct: Vec<_> = new.options.iter().filter(|o| o.is_correct).collect();
            assert_eq!(correct.len(), 1);
            assert_eq!(correct[0].text, source.correct_answer);
            assert_eq!(new.options.len(), source.incorrect_answers.len() + 1);
        }
        assert_eq!(created[0].points_value, 5);
        assert_eq!(created[1].points_value, 10);
        assert_eq!(created[1].question_type, QuestionType::TrueFalse);
    }

    #[tokio::test]
    async fn test_import_creates_trivia_then_questions() {
        let mock = mock_with_bank(4);
        let query = ExternalQuery {
            amount: 3,
            difficulty: Difficulty::Hard,
            ..ExternalQuery::default()
        };

        let trivia = import_external(&mock, &query).await.unwrap();
        assert_eq!(trivia.title, "Open Trivia - hard");

        let calls = mock.get_calls();
        assert!(matches!(calls[0], MockCall::Categories));
        assert!(matches!(calls[1], MockCall::ExternalQuestions { .. }));
        match &calls[2] {
            MockCall::CreateTrivia { trivia } => {
                assert_eq!(trivia.category_id, "cat-1");
                assert_eq!(trivia.status, "published");
            }
            other => panic!("expected CreateTrivia, got {other:?}"),
        }
        let created: Vec<_> = calls
            .iter()
            .filter_map(|c| match c {
                MockCall::CreateQuestion { question } => Some(question),
                _ => None,
            })
            .collect();
        assert_eq!(created.len(), 3);
        assert!(created.iter().all(|q| q.trivia_id == trivia.trivia_id));
        assert!(created.iter().all(|q| q.points_value == 15));
    }

    #[tokio::test]
    async fn test_import_without_categories_creates_nothing() {
        let mock = MockSessionGateway::new().with_external_bank(vec![bank_question(
            "a",
            Difficulty::Easy,
        )]);
        let query = ExternalQuery {
            amount: 1,
            ..ExternalQuery::default()
        };

        let err = import_external(&mock, &query).await.unwrap_err();
        assert!(matches!(err, GameError::InvalidImport(_)));
        assert!(!mock
            .get_calls()
            .iter()
            .any(|c| matches!(c, MockCall::CreateTrivia { .. })));
    }

    #[tokio::test]
    async fn test_short_bank_is_reported() {
        let mock = mock_with_bank(2);
        let query = ExternalQuery {
            amount: 5,
            ..ExternalQuery::default()
        };
        let err = import_external(&mock, &query).await.unwrap_err();
        assert!(matches!(
            err,
            GameError::Client(trivia_client::ClientError::NotFound(_))
        ));
    }
}
