use std::collections::VecDeque;

use odatalink_domain::QueryId;

use crate::queries::ClientQuery;

/// FIFO of queries waiting for the next drain pass.
#[derive(Debug, Default)]
pub(crate) struct PendingRequest {
    queries: VecDeque<ClientQuery>,
    next_id: u64,
}

impl PendingRequest {
    /// Assign the next monotonic id and enqueue.
    pub fn add(&mut self, mut query: ClientQuery) -> QueryId {
        self.next_id += 1;
        let id = QueryId(self.next_id);
        query.set_id(id);
        self.queries.push_back(query);
        id
    }

    /// Snapshot for one drain pass; later additions wait for the next pass.
    pub fn take_all(&mut self) -> Vec<ClientQuery> {
        self.queries.drain(..).collect()
    }

    pub fn len(&self) -> usize {
        self.queries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use odatalink_domain::EntityId;

    use super::*;

    #[test]
    fn ids_are_monotonic_and_order_is_fifo() {
        let mut pending = PendingRequest::default();
        let first = pending.add(ClientQuery::read(EntityId::new(0, 0)));
        let second = pending.add(ClientQuery::read(EntityId::new(1, 0)));
        assert!(first < second);

        let snapshot = pending.take_all();
        assert!(pending.is_empty());
        assert_eq!(snapshot.iter().map(ClientQuery::id).collect::<Vec<_>>(), vec![first, second]);
    }
}
