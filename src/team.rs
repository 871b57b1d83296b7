id_type!(TeamId);
