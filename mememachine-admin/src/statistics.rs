use std::sync::Arc;

use crate::{Database, DatabaseError, NewPlay, PlayCount, PlayFilter};

/// Play counts per sound, split by how the sound was picked
#[derive(Debug)]
pub struct StatisticsOverview {
    pub all: Vec<PlayCount>,
    pub random: Vec<PlayCount>,
    pub dedicated: Vec<PlayCount>,
}

/// Read-only aggregation over the play log the bot writes to
pub struct Statistics<Db> {
    db: Arc<Db>,
}

impl<Db> Statistics<Db>
where
    Db: Database,
{
    pub fn new(db: &Arc<Db>) -> Self {
        Self { db: db.clone() }
    }

    /// Lifetime play count per sound, ordered by sound name
    pub async fn counts(&self, filter: PlayFilter) -> Result<Vec<PlayCount>, DatabaseError> {
        self.db.play_counts(filter).await
    }

    pub async fn overview(&self) -> Result<StatisticsOverview, DatabaseError> {
        let (all, random, dedicated) = tokio::try_join!(
            self.counts(PlayFilter::All),
            self.counts(PlayFilter::Random),
            self.counts(PlayFilter::Dedicated),
        )?;

        Ok(StatisticsOverview {
            all,
            random,
            dedicated,
        })
    }

    /// Appends a play event
    pub async fn record(&self, sound_name: &str, is_random: bool) -> Result<(), DatabaseError> {
        self.db
            .record_play(NewPlay {
                sound_name: sound_name.to_string(),
                is_random,
            })
            .await
    }
}
