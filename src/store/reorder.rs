/// Moves the item identified by `source` to the index currently held by
/// `target`, shifting everything in between by one.
///
/// Returns the `(from, to)` indices of the applied move, or `None` when the
/// two identities are equal or either one is no longer present.
pub fn move_by_identity<T, K, F>(
    items: &mut Vec<T>,
    key: F,
    source: &K,
    target: &K,
) -> Option<(usize, usize)>
where
    K: PartialEq,
    F: Fn(&T) -> K,
{
    if source == target {
        return None;
    }
    let from = items.iter().position(|item| key(item) == *source)?;
    let to = items.iter().position(|item| key(item) == *target)?;
    let item = items.remove(from);
    items.insert(to, item);
    Some((from, to))
}

#[cfg(test)]
mod tests {
    use super::move_by_identity;

    fn letters() -> Vec<char> {
        vec!['a', 'b', 'c', 'd', 'e']
    }

    #[test]
    fn moving_onto_itself_is_a_noop() {
        let mut items = letters();
        assert_eq!(move_by_identity(&mut items, |c| *c, &'c', &'c'), None);
        assert_eq!(items, letters());
    }

    #[test]
    fn missing_items_are_ignored() {
        let mut items = letters();
        assert_eq!(move_by_identity(&mut items, |c| *c, &'z', &'a'), None);
        assert_eq!(move_by_identity(&mut items, |c| *c, &'a', &'z'), None);
        assert_eq!(items, letters());
    }

    #[test]
    fn moving_down_lands_on_target_index() {
        let mut items = letters();
        assert_eq!(move_by_identity(&mut items, |c| *c, &'b', &'d'), Some((1, 3)));
        assert_eq!(items, vec!['a', 'c', 'd', 'b', 'e']);
    }

    #[test]
    fn moving_up_lands_on_target_index() {
        let mut items = letters();
        assert_eq!(move_by_identity(&mut items, |c| *c, &'e', &'a'), Some((4, 0)));
        assert_eq!(items, vec!['e', 'a', 'b', 'c', 'd']);
    }

    #[test]
    fn relative_order_of_others_is_preserved() {
        let mut items = letters();
        move_by_identity(&mut items, |c| *c, &'a', &'e');
        let others: Vec<char> = items.iter().copied().filter(|c| *c != 'a').collect();
        assert_eq!(others, vec!['b', 'c', 'd', 'e']);
        assert_eq!(items[4], 'a');
    }
}
